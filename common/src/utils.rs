// common/src/utils.rs
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Setup tracing for consistent logging across services.
///
/// Defaults to INFO; `RUST_LOG` overrides.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Tracing subscriber already installed");
    }
}

/// Shorten an address for display and logs: `AbCdEfGh...12345678`
pub fn format_address(address: &str) -> String {
    const KEEP: usize = 8;

    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= KEEP * 2 {
        return address.to_string();
    }

    let head: String = chars[..KEEP].iter().collect();
    let tail: String = chars[chars.len() - KEEP..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Raw ed25519 public key behind a base58 chain address
pub fn decode_wallet_address(address: &str) -> Option<[u8; 32]> {
    bs58::decode(address).into_vec().ok()?.try_into().ok()
}

pub fn is_valid_wallet_address(address: &str) -> bool {
    decode_wallet_address(address).is_some()
}
