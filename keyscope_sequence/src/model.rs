// Copyright 2025 the Keyscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keyframe data as exposed by the animation engine.
//!
//! An [`AnimSequence`] is an ordered list of named properties. A property is
//! either scalar (one [`Channel`] of keyframes) or vector (one channel per
//! axis). Each channel is ordered by time.

use alloc::string::String;
use alloc::vec::Vec;
use kurbo::Point;

/// A timed sample of a scalar channel.
///
/// `p1`/`p2` shape the segment arriving from the previous keyframe. They are
/// normalized to that segment: `x` runs from the previous keyframe's time (0)
/// to this one's (1), `y` from the previous value (0) to this value (1).
/// `p1` alone makes the segment quadratic, `p1` and `p2` make it cubic, and no
/// handle makes it linear.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Keyframe {
    /// Time offset from the start of the sequence.
    pub time: f64,
    /// Value at `time`.
    pub value: f64,
    /// First control point of the incoming segment.
    pub p1: Option<Point>,
    /// Second control point of the incoming segment (cubic only).
    pub p2: Option<Point>,
}

/// Shape of the segment arriving at a keyframe.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Segment {
    /// Straight line.
    Linear,
    /// One control point.
    Quadratic(Point),
    /// Two control points.
    Cubic(Point, Point),
}

impl Keyframe {
    /// A keyframe reached by a straight segment.
    pub const fn new(time: f64, value: f64) -> Self {
        Self {
            time,
            value,
            p1: None,
            p2: None,
        }
    }

    /// Shape the incoming segment as a quadratic curve.
    pub fn with_quadratic(mut self, p1: Point) -> Self {
        self.p1 = Some(p1);
        self.p2 = None;
        self
    }

    /// Shape the incoming segment as a cubic curve.
    pub fn with_cubic(mut self, p1: Point, p2: Point) -> Self {
        self.p1 = Some(p1);
        self.p2 = Some(p2);
        self
    }

    /// The incoming segment's shape. A lone `p2` does not make a curve.
    pub fn segment(&self) -> Segment {
        match (self.p1, self.p2) {
            (Some(p1), Some(p2)) => Segment::Cubic(p1, p2),
            (Some(p1), None) => Segment::Quadratic(p1),
            (None, _) => Segment::Linear,
        }
    }
}

/// Keyframes of one scalar channel, ordered by time.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Channel {
    /// The keyframes.
    pub keys: Vec<Keyframe>,
}

impl Channel {
    /// A channel over the given keyframes.
    pub fn new(keys: impl IntoIterator<Item = Keyframe>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    /// Latest keyframe time (0 when empty).
    pub fn duration(&self) -> f64 {
        self.keys.iter().fold(0.0, |acc, k| acc.max(k.time))
    }
}

/// An animated property.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Property {
    /// A single channel.
    Scalar(Channel),
    /// One channel per vector component.
    Vector(Vec<Channel>),
}

impl Property {
    /// The property's channels (exactly one for scalars).
    pub fn channels(&self) -> &[Channel] {
        match self {
            Self::Scalar(c) => core::slice::from_ref(c),
            Self::Vector(cs) => cs,
        }
    }

    /// Mutable access to the property's channels.
    pub fn channels_mut(&mut self) -> &mut [Channel] {
        match self {
            Self::Scalar(c) => core::slice::from_mut(c),
            Self::Vector(cs) => cs,
        }
    }

    /// Latest keyframe time across all channels.
    pub fn derived_duration(&self) -> f64 {
        self.channels()
            .iter()
            .fold(0.0, |acc, c| acc.max(c.duration()))
    }
}

/// A named property with its cached duration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyEntry {
    name: String,
    property: Property,
    duration: f64,
}

impl PropertyEntry {
    /// The property's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The property's keyframes.
    pub fn property(&self) -> &Property {
        &self.property
    }

    /// Cached duration (latest keyframe time), kept current by
    /// [`AnimSequence::refresh_durations`].
    pub fn duration(&self) -> f64 {
        self.duration
    }
}

/// Address of one keyframe inside an [`AnimSequence`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyRef {
    /// Property index.
    pub property: usize,
    /// Channel index within the property (0 for scalars).
    pub channel: usize,
    /// Keyframe index within the channel.
    pub key: usize,
}

impl KeyRef {
    /// Create a keyframe address.
    pub const fn new(property: usize, channel: usize, key: usize) -> Self {
        Self {
            property,
            channel,
            key,
        }
    }
}

/// The animated object's keyframe data: an ordered list of named properties and
/// the cached playback duration.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnimSequence {
    props: Vec<PropertyEntry>,
    duration: f64,
}

impl AnimSequence {
    /// An empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`push_property`](Self::push_property).
    pub fn with_property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.push_property(name, property);
        self
    }

    /// Append a property and return its index.
    pub fn push_property(&mut self, name: impl Into<String>, property: Property) -> usize {
        self.props.push(PropertyEntry {
            name: name.into(),
            duration: property.derived_duration(),
            property,
        });
        self.refresh_durations();
        self.props.len() - 1
    }

    /// Properties in read order.
    pub fn properties(&self) -> &[PropertyEntry] {
        &self.props
    }

    /// Mutable access to a property's keyframes. Cached durations are not
    /// updated until [`refresh_durations`](Self::refresh_durations).
    pub fn property_mut(&mut self, index: usize) -> Option<&mut Property> {
        self.props.get_mut(index).map(|p| &mut p.property)
    }

    /// The channel holding `key`.
    pub fn channel(&self, key: KeyRef) -> Option<&Channel> {
        self.props.get(key.property)?.property.channels().get(key.channel)
    }

    /// The keyframe at `key`.
    pub fn keyframe(&self, key: KeyRef) -> Option<&Keyframe> {
        self.channel(key)?.keys.get(key.key)
    }

    /// Mutable access to the keyframe at `key`.
    pub fn keyframe_mut(&mut self, key: KeyRef) -> Option<&mut Keyframe> {
        self.props
            .get_mut(key.property)?
            .property
            .channels_mut()
            .get_mut(key.channel)?
            .keys
            .get_mut(key.key)
    }

    /// Cached playback duration: the latest keyframe time of any property.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Re-derive every property's cached duration and the sequence duration as
    /// the maximum over properties.
    pub fn refresh_durations(&mut self) {
        let mut max = 0.0_f64;
        for p in &mut self.props {
            p.duration = p.property.derived_duration();
            max = max.max(p.duration);
        }
        self.duration = max;
    }

    /// Latest keyframe time strictly before `t`, or 0.
    pub fn previous_keyframe_time(&self, t: f64) -> f64 {
        self.key_times()
            .filter(|&k| k < t)
            .fold(0.0, f64::max)
    }

    /// Earliest keyframe time strictly after `t`, or the sequence duration.
    pub fn next_keyframe_time(&self, t: f64) -> f64 {
        self.key_times()
            .filter(|&k| k > t)
            .fold(self.duration, f64::min)
    }

    fn key_times(&self) -> impl Iterator<Item = f64> + '_ {
        self.props
            .iter()
            .flat_map(|p| p.property.channels())
            .flat_map(|c| c.keys.iter().map(|k| k.time))
    }
}
