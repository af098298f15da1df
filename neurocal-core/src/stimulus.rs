use serde::{Deserialize, Serialize};

pub const TARGET_COUNT: usize = 8;

/// Angles of the peripheral targets around the fixation circle, in degrees.
pub const TARGET_ANGLES_DEG: [f64; TARGET_COUNT] = [0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0];

const CONTROL_PANEL_HEIGHT: f64 = 60.0;
const CENTER_RADIUS_RATIO: f64 = 0.10;
const TARGET_DISTANCE_RATIO: f64 = 0.45;
pub const TARGET_RADIUS: f64 = 60.0;

/// One of the eight peripheral targets, numbered 1..=8 clockwise from the right.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TargetIndex(u8);

impl TargetIndex {
    pub fn new(n: u8) -> Option<Self> {
        (1..=TARGET_COUNT as u8).contains(&n).then_some(Self(n))
    }

    pub fn all() -> impl Iterator<Item = TargetIndex> {
        (1..=TARGET_COUNT as u8).map(TargetIndex)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn zero_based(self) -> usize {
        self.0 as usize - 1
    }

    /// Motor-imagery cue shown on the EEG rest screen before a target's first repetition.
    pub fn instruction(self) -> &'static str {
        match self.0 {
            1 => "THINK MOVE FORWARD",
            2 => "THINK MOVE BACKWARD",
            3 => "THINK TURN LEFT",
            4 => "THINK TURN RIGHT",
            5 => "THINK MOVE UP",
            6 => "THINK MOVE DOWN",
            7 => "THINK ACTION STOP",
            _ => "THINK ACTION START",
        }
    }
}

impl TryFrom<u8> for TargetIndex {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        TargetIndex::new(n).ok_or_else(|| format!("target index {n} outside 1..={TARGET_COUNT}"))
    }
}

impl From<TargetIndex> for u8 {
    fn from(t: TargetIndex) -> u8 {
        t.0
    }
}

impl std::fmt::Display for TargetIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Screen geometry of the fixation circle and the target ring
#[derive(Debug, Clone, PartialEq)]
pub struct StimulusLayout {
    pub width: f64,
    pub height: f64,
    pub center: (f64, f64),
    pub center_radius: f64,
    targets: [(f64, f64); TARGET_COUNT],
}

impl StimulusLayout {
    pub fn new(width: f64, height: f64) -> Self {
        let mut layout = Self {
            width,
            height,
            center: (0.0, 0.0),
            center_radius: 0.0,
            targets: [(0.0, 0.0); TARGET_COUNT],
        };
        layout.resize(width, height);
        layout
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.center = ((width / 2.0).floor(), (height / 2.0).floor());

        let min_dim = width.min(height - CONTROL_PANEL_HEIGHT).max(0.0);
        self.center_radius = (min_dim * CENTER_RADIUS_RATIO).floor();
        let distance = (min_dim * TARGET_DISTANCE_RATIO).floor();

        for (slot, angle) in self.targets.iter_mut().zip(TARGET_ANGLES_DEG) {
            let rad = angle.to_radians();
            *slot = (
                self.center.0 + distance * rad.cos(),
                self.center.1 + distance * rad.sin(),
            );
        }
    }

    pub fn position(&self, target: TargetIndex) -> (f64, f64) {
        self.targets[target.zero_based()]
    }

    /// Maps normalized display-area coordinates to pixels.
    pub fn to_pixels(&self, nx: f64, ny: f64) -> (f64, f64) {
        (nx * self.width, ny * self.height)
    }

    pub fn is_within(&self, target: TargetIndex, x: f64, y: f64, radius: f64) -> bool {
        let (cx, cy) = self.position(target);
        (x - cx).hypot(y - cy) <= radius
    }

    /// First target whose center lies within `radius` of the point.
    pub fn hit_target(&self, x: f64, y: f64, radius: f64) -> Option<TargetIndex> {
        TargetIndex::all().find(|t| self.is_within(*t, x, y, radius))
    }
}

impl Default for StimulusLayout {
    fn default() -> Self {
        Self::new(1200.0, 800.0)
    }
}
