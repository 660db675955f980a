pub mod net;
pub mod qdisc;
pub mod queue;
pub mod scenario;
pub mod sim;
pub mod trace;
pub mod wifi;

#[cfg(test)]
mod test;
