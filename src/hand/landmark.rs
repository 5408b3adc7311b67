//! Hand landmarks and the canonical joint order.

use std::fmt;

/// Number of landmarks in a complete [`HandPose`].
pub const NUM_LANDMARKS: usize = 21;

/// Index of the wrist landmark inside a [`HandPose`].
pub const WRIST_INDEX: usize = NUM_LANDMARKS - 1;

/// A single detected hand joint.
///
/// Positions are in the pose estimator's normalized coordinate space, where both axes range from
/// 0.0 to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    x: f32,
    y: f32,
    confidence: f32,
}

impl Landmark {
    #[inline]
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    /// Returns the estimator's confidence in this joint, by convention in range 0.0 to 1.0.
    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    #[inline]
    pub fn position(&self) -> [f32; 2] {
        [self.x, self.y]
    }
}

/// Fingers of a hand, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Little,
}

impl Finger {
    /// All fingers, in the order their joints appear in a [`HandPose`].
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Little,
    ];

    /// Returns the joints of this finger, ordered from the fingertip towards the palm.
    pub fn joints(self) -> &'static [JointName; 4] {
        &FINGER_JOINTS[self as usize]
    }

    /// Returns the range of [`HandPose`] indices occupied by this finger's joints.
    pub fn indices(self) -> std::ops::Range<usize> {
        let start = self as usize * 4;
        start..start + 4
    }
}

/// Names for the hand pose landmarks.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MP**/**MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **IP**/**DIP**: (Distal) Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointName {
    ThumbTip,
    ThumbIp,
    ThumbMp,
    ThumbCmc,
    IndexTip,
    IndexDip,
    IndexPip,
    IndexMcp,
    MiddleTip,
    MiddleDip,
    MiddlePip,
    MiddleMcp,
    RingTip,
    RingDip,
    RingPip,
    RingMcp,
    LittleTip,
    LittleDip,
    LittlePip,
    LittleMcp,
    Wrist,
}

impl JointName {
    /// Returns the position of this joint in a [`HandPose`].
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns the finger this joint belongs to, or [`None`] for the wrist.
    pub fn finger(self) -> Option<Finger> {
        Finger::ALL.get(self.index() / 4).copied()
    }
}

impl fmt::Display for JointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

const FINGER_JOINTS: [[JointName; 4]; 5] = {
    use JointName::*;
    [
        [ThumbTip, ThumbIp, ThumbMp, ThumbCmc],
        [IndexTip, IndexDip, IndexPip, IndexMcp],
        [MiddleTip, MiddleDip, MiddlePip, MiddleMcp],
        [RingTip, RingDip, RingPip, RingMcp],
        [LittleTip, LittleDip, LittlePip, LittleMcp],
    ]
};

/// All 21 joints in canonical order: the four joints of each finger (thumb to little finger), then
/// the wrist.
pub const CANONICAL_ORDER: [JointName; NUM_LANDMARKS] = {
    use JointName::*;
    [
        ThumbTip, ThumbIp, ThumbMp, ThumbCmc, //
        IndexTip, IndexDip, IndexPip, IndexMcp, //
        MiddleTip, MiddleDip, MiddlePip, MiddleMcp, //
        RingTip, RingDip, RingPip, RingMcp, //
        LittleTip, LittleDip, LittlePip, LittleMcp, //
        Wrist,
    ]
};

/// The full set of 21 landmarks of one hand, in [`CANONICAL_ORDER`].
///
/// A [`HandPose`] can only be constructed from exactly 21 landmarks, so downstream consumers never
/// observe a partial hand.
#[derive(Debug, Clone, PartialEq)]
pub struct HandPose {
    landmarks: [Landmark; NUM_LANDMARKS],
}

impl HandPose {
    pub fn new(landmarks: [Landmark; NUM_LANDMARKS]) -> Self {
        Self { landmarks }
    }

    /// Builds a pose from an iterator of landmarks in canonical order.
    ///
    /// Returns [`None`] unless `iter` yields exactly [`NUM_LANDMARKS`] items.
    pub fn from_landmarks<I: IntoIterator<Item = Landmark>>(iter: I) -> Option<Self> {
        let landmarks = iter.into_iter().collect::<Vec<_>>();
        let landmarks: [Landmark; NUM_LANDMARKS] = landmarks.try_into().ok()?;
        Some(Self { landmarks })
    }

    #[inline]
    pub fn landmarks(&self) -> &[Landmark; NUM_LANDMARKS] {
        &self.landmarks
    }

    #[inline]
    pub fn get(&self, joint: JointName) -> Landmark {
        self.landmarks[joint.index()]
    }

    #[inline]
    pub fn wrist(&self) -> Landmark {
        self.landmarks[WRIST_INDEX]
    }

    /// Returns the lowest confidence value of all landmarks.
    pub fn min_confidence(&self) -> f32 {
        self.landmarks
            .iter()
            .map(|lm| lm.confidence())
            .fold(f32::INFINITY, f32::min)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Landmark> + '_ {
        self.landmarks.iter()
    }
}
