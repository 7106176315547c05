/// Two equally-shaped resources that trade places every cycle.
///
/// One slot is *active* (the write target of the current cycle) and the other
/// holds the previous cycle's result. [`SlotPair::split`] hands out both at
/// once as `&mut` and `&`, so the borrow checker rules out the two ever
/// aliasing; [`SlotPair::rotate`] makes the slot just written readable.
#[derive(Debug)]
pub struct SlotPair<T> {
    slots: [T; 2],
    active: usize,
}

impl<T> SlotPair<T> {
    pub fn new(first: T, second: T) -> Self {
        Self {
            slots: [first, second],
            active: 0,
        }
    }

    /// Index of the write slot: `k % 2` after `k` rotations.
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Returns `(write, read)`.
    pub fn split(&mut self) -> (&mut T, &T) {
        let [first, second] = &mut self.slots;
        if self.active == 0 {
            (first, second)
        } else {
            (second, first)
        }
    }

    pub fn read_slot(&self) -> &T {
        &self.slots[1 - self.active]
    }

    pub fn rotate(&mut self) {
        self.active = 1 - self.active;
    }
}
