//! Governance subsystems, leaf-first: the proposal model, voter registry,
//! comment threads and tally are independent; `amendment` wires them into the
//! lifecycle state machine over a `proposal_store`.

pub mod amendment;
pub mod comments;
pub mod notify;
pub mod proposal;
pub mod proposal_store;
pub mod registry;
pub mod tally;
