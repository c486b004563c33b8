use alloy::{
    primitives::{Address, B256, Signature},
    signers::{SignerSync, local::PrivateKeySigner},
    sol_types::{Eip712Domain, SolStruct, eip712_domain},
};

use crate::{Chain, abi::protocol::LimitOrder};

/// Signing identity bound to one order-protocol deployment.
///
/// Key handling stays synchronous: orders are hashed and signed locally,
/// only submission touches the network.
#[derive(Clone, Debug)]
pub struct Wallet {
    signer: PrivateKeySigner,
    chain: Chain,
}

impl Wallet {
    pub fn new(signer: PrivateKeySigner, chain: Chain) -> Self {
        Self { signer, chain }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// EIP-712 domain of the order protocol deployment.
    pub fn domain(&self) -> Eip712Domain {
        eip712_domain!(
            name: "TriggerOrderProtocol",
            version: "1",
            chain_id: self.chain.chain_id(),
            verifying_contract: self.chain.order_protocol(),
        )
    }

    /// EIP-712 digest identifying `order` under the protocol domain:
    /// `keccak256(0x1901 || domainSeparator || hashStruct(order))`.
    ///
    /// Computed locally; this is the hash the protocol indexes orders by.
    pub fn order_hash(&self, order: &LimitOrder) -> B256 {
        order.eip712_signing_hash(&self.domain())
    }

    /// Signs `order` under the protocol domain.
    pub fn sign_order(&self, order: &LimitOrder) -> Result<Signature, alloy::signers::Error> {
        self.signer.sign_typed_data_sync(order, &self.domain())
    }
}
