pub mod close;
pub mod whoami;
