use std::fmt;

/// Item generated by a producer: its id and a 1-based sequence number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Record {
    pub producer: usize,
    pub seq: usize,
}

impl Record {
    #[inline]
    pub fn new(producer: usize, seq: usize) -> Self {
        Self { producer, seq }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record-{}-{}", self.producer, self.seq)
    }
}
