//! Client connection representation and management.
//!
//! This module defines the per-connection state tracked while a client is
//! being served.

use bitrealm_protocol::AccountId;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::SystemTime;

/// Represents an individual client connection to the server.
///
/// The protocol carries the account id in every request instead of binding a
/// connection to one account, so a connection simply remembers every account
/// it has delivered cached responses to.
#[derive(Debug)]
pub struct ClientConnection {
    /// The remote network address of the client
    pub remote_addr: SocketAddr,

    /// When this connection was established
    pub connected_at: SystemTime,

    /// Accounts with responses recorded in the delivery cache by this connection
    accounts: HashSet<AccountId>,

    /// Number of requests dispatched so far
    requests: u64,
}

impl ClientConnection {
    /// Creates a new client connection with the specified remote address.
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self {
            remote_addr,
            connected_at: SystemTime::now(),
            accounts: HashSet::new(),
            requests: 0,
        }
    }

    pub fn note_request(&mut self) {
        self.requests += 1;
    }

    /// Remembers that a cached response was delivered to `account_id`.
    pub fn note_delivery(&mut self, account_id: AccountId) {
        self.accounts.insert(account_id);
    }

    pub fn accounts(&self) -> impl Iterator<Item = AccountId> + '_ {
        self.accounts.iter().copied()
    }

    pub fn request_count(&self) -> u64 {
        self.requests
    }
}
