//! Root of the message lattice
//!
//! Every message that travels over a link extends [`Event`]. Its transport
//! metadata are ordinary fingerprinted fields, so an untouched handle costs
//! nothing on the wire and a handler can bind on a channel name like on any
//! other field.

crate::message! {
    /// Base event with routing metadata
    pub struct Event: 1 {
        /// Routing handle of the sending peer
        handle: u64,
        /// Correlation handle a waiting caller resumes on
        wait_handle: u64,
        channel: String,
        /// Payload passed through a link transform (compression, cipher)
        transform: bool,
    }
}
