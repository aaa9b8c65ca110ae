/// Agent index per seat (North, South) for each replay of a deal.
pub struct Seatings {
    seatings: Vec<[usize; 2]>,
}

impl Seatings {
    pub fn new(swap_seats: bool) -> Self {
        let mut seatings = vec![[0, 1]];
        if swap_seats {
            seatings.push([1, 0]);
        }
        Self { seatings }
    }

    pub fn as_slice(&self) -> &[[usize; 2]] {
        &self.seatings
    }
}
