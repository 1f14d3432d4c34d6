mod bounty_flow;
mod conditioned_flow;
mod config_loading;
mod dispatcher_drops;
mod locked_contracts;
mod scheduler;
