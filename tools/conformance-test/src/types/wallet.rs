/*!
   Test wallets, addressable on any chain of the pair.
*/

use core::fmt::Debug;

use subtle_encoding::bech32;

use crate::error::Error;

/**
   A wallet holding a key on one chain. The same logical wallet can be
   addressed on any chain by re-deriving its address with that chain's
   bech32 account prefix, which is how the harness traces ownership
   across both legs of a transfer.
*/
pub trait Wallet: Debug + Send + Sync + 'static {
    /// Name of the key in the keyring of the chain the wallet was created on.
    fn key_name(&self) -> &str;

    /// The raw account address bytes.
    fn address_bytes(&self) -> &[u8];

    /// The bech32 address of the wallet under the given account prefix.
    fn formatted_address_with_prefix(&self, prefix: &str) -> String;
}

/// A wallet whose addresses are derived with plain bech32 encoding, as done
/// by Cosmos SDK chains.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bech32Wallet {
    pub key_name: String,
    pub address: Vec<u8>,
}

impl Bech32Wallet {
    pub fn new(key_name: impl Into<String>, address: Vec<u8>) -> Self {
        Self {
            key_name: key_name.into(),
            address,
        }
    }

    /// Recover the wallet from one of its bech32 addresses.
    pub fn from_bech32(key_name: impl Into<String>, address: &str) -> Result<Self, Error> {
        let (_prefix, address) = bech32::decode(address)
            .map_err(|e| Error::generic(eyre::eyre!("invalid bech32 address {address}: {e}")))?;

        Ok(Self::new(key_name, address))
    }
}

impl Wallet for Bech32Wallet {
    fn key_name(&self) -> &str {
        &self.key_name
    }

    fn address_bytes(&self) -> &[u8] {
        &self.address
    }

    fn formatted_address_with_prefix(&self, prefix: &str) -> String {
        bech32::encode(prefix, &self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn same_wallet_across_prefixes() {
        let wallet = Bech32Wallet::new("relay-packet-abcd", vec![7; 20]);

        let xion_address = wallet.formatted_address_with_prefix("xion");
        let osmo_address = wallet.formatted_address_with_prefix("osmo");

        assert!(xion_address.starts_with("xion1"));
        assert!(osmo_address.starts_with("osmo1"));
        assert_ne!(xion_address, osmo_address);

        let recovered = Bech32Wallet::from_bech32("relay-packet-abcd", &osmo_address).unwrap();
        assert_eq!(recovered, wallet);
    }
}
