/// What happened to the pointer set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    /// First pointer touched down.
    Down,
    /// One or more pointers moved.
    Move,
    /// Last pointer lifted.
    Up,
    /// An additional pointer touched down.
    PointerDown,
    /// A pointer lifted while others remain down.
    PointerUp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

impl Pointer {
    pub const fn new(id: u32, x: f32, y: f32) -> Self {
        Self { id, x, y }
    }

    pub fn distance_to(&self, other: &Pointer) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn midpoint(&self, other: &Pointer) -> (f32, f32) {
        ((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// A raw pointer event from the host.
///
/// `pointers` holds every pointer that is down when the event fires. For
/// `Up` and `PointerUp` the lifting pointer comes first and any pointers that
/// stay down follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub pointers: Vec<Pointer>,
    pub timestamp_ms: u64,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, pointers: Vec<Pointer>, timestamp_ms: u64) -> Self {
        Self {
            kind,
            pointers,
            timestamp_ms,
        }
    }

    pub fn down(x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self::new(PointerKind::Down, vec![Pointer::new(0, x, y)], timestamp_ms)
    }

    pub fn moved(x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self::new(PointerKind::Move, vec![Pointer::new(0, x, y)], timestamp_ms)
    }

    pub fn up(x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self::new(PointerKind::Up, vec![Pointer::new(0, x, y)], timestamp_ms)
    }

    /// Two-pointer event, pointer ids 0 and 1.
    pub fn two(kind: PointerKind, a: (f32, f32), b: (f32, f32), timestamp_ms: u64) -> Self {
        Self::new(
            kind,
            vec![Pointer::new(0, a.0, a.1), Pointer::new(1, b.0, b.1)],
            timestamp_ms,
        )
    }

    pub fn primary(&self) -> Option<&Pointer> {
        self.pointers.first()
    }

    /// The first two pointers, when there are at least two.
    pub fn pair(&self) -> Option<(&Pointer, &Pointer)> {
        match self.pointers.as_slice() {
            [a, b, ..] => Some((a, b)),
            _ => None,
        }
    }
}
