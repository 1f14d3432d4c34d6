mod payout;
mod request_hash;
