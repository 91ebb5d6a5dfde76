pub mod difficulty;
pub mod pow;
pub mod skiplist;
pub mod trust;
