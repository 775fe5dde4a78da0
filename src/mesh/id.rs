//! Short random identifiers for nodes and messages.
//!
//! Nothing here is security sensitive: peers are not authenticated, the id
//! space only has to make accidental collisions negligible for a peer group.

use rand::Rng;

/// Prefix carried by every node id.
pub const NODE_ID_PREFIX: &str = "FM-";

/// Length of the random part of a node id (36^6 combinations).
pub const NODE_ID_SUFFIX_LEN: usize = 6;

/// Length of a message id (36^12 combinations).
pub const MESSAGE_ID_LEN: usize = 12;

const NODE_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MESSAGE_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn random_string(alphabet: &[u8], len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

/// Generate a node id such as `FM-K3X9Q2`.
pub fn node_id() -> String {
    format!(
        "{}{}",
        NODE_ID_PREFIX,
        random_string(NODE_ID_ALPHABET, NODE_ID_SUFFIX_LEN)
    )
}

/// Generate a lowercase base36 message id.
pub fn message_id() -> String {
    random_string(MESSAGE_ID_ALPHABET, MESSAGE_ID_LEN)
}

/// Generate a default nickname such as `User-4821`.
pub fn nickname() -> String {
    let number: u16 = rand::thread_rng().gen_range(1000..=9999);
    format!("User-{}", number)
}
