pub mod turn_lock;
