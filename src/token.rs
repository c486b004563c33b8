use alloy::{
    primitives::{Address, U256},
    providers::Provider,
};
use tracing::info;

use crate::{
    abi::token::IERC20::{self, IERC20Instance},
    error::ChainError,
    types::TokenInfo,
};

/// ERC-20 adapter for a single token contract.
pub struct TokenClient<P> {
    instance: IERC20Instance<P>,
}

impl<P: Provider + Clone> TokenClient<P> {
    pub fn new(token: Address, provider: P) -> Self {
        Self {
            instance: IERC20::new(token, provider),
        }
    }

    pub fn address(&self) -> Address {
        *self.instance.address()
    }

    /// Token identity (name, symbol, decimals), fetched concurrently.
    pub async fn metadata(&self) -> Result<TokenInfo, ChainError> {
        let (name_call, symbol_call, decimals_call) = (
            self.instance.name(),
            self.instance.symbol(),
            self.instance.decimals(),
        );
        let (name, symbol, decimals) = futures::try_join!(
            name_call.call().into_future(),
            symbol_call.call().into_future(),
            decimals_call.call().into_future(),
        )
        .map_err(ChainError::from)?;
        Ok(TokenInfo {
            address: self.address(),
            symbol,
            name,
            decimals,
        })
    }

    pub async fn balance(&self, owner: Address) -> Result<U256, ChainError> {
        Ok(self.instance.balanceOf(owner).call().await?)
    }

    pub async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, ChainError> {
        Ok(self.instance.allowance(owner, spender).call().await?)
    }

    /// Approves `spender` for `value` from the provider's signer and waits
    /// for a successful receipt.
    pub async fn approve(&self, spender: Address, value: U256) -> Result<(), ChainError> {
        let receipt = self
            .instance
            .approve(spender, value)
            .send()
            .await?
            .get_receipt()
            .await?;
        if !receipt.status() {
            return Err(ChainError::reverted_in_receipt());
        }
        info!(token = %self.address(), %spender, %value, "approval granted");
        Ok(())
    }

    /// Mints `value` to `to` on deployments whose token allows open minting.
    pub async fn mint(&self, to: Address, value: U256) -> Result<(), ChainError> {
        let receipt = self
            .instance
            .mint(to, value)
            .send()
            .await?
            .get_receipt()
            .await?;
        if !receipt.status() {
            return Err(ChainError::reverted_in_receipt());
        }
        info!(token = %self.address(), %to, %value, "minted");
        Ok(())
    }

    /// Approves `spender` for `required` unless the current allowance
    /// already covers it. `owner` must be the provider's signer.
    pub async fn ensure_allowance(
        &self,
        owner: Address,
        spender: Address,
        required: U256,
    ) -> Result<(), ChainError> {
        let current = self.allowance(owner, spender).await?;
        if current >= required {
            return Ok(());
        }
        self.approve(spender, required).await
    }
}
