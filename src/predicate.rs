use alloy::{
    primitives::{Address, Bytes, U256},
    sol_types::SolCall,
};

use crate::{
    abi::{oracle::IIndexOracle, protocol::IOrderProtocol},
    types::{Operator, OrderCondition},
};

/// ABI-encodes `condition` as an order-protocol predicate probing `oracle`.
///
/// The protocol evaluates the predicate at fill time:
/// `arbitraryStaticCall(oracle, getIndexValue(id))` yields the live index
/// value (the first return word), and the comparator wrapper checks it
/// against the threshold. The protocol only exposes strict comparators, so
/// `Gte`/`Lte` encode as `gt`/`lt` and `Neq` as `not(eq(..))`.
///
/// Inputs are already typed, so encoding cannot fail and touches no I/O.
pub fn encode(oracle: Address, condition: &OrderCondition) -> Bytes {
    let inner = IIndexOracle::getIndexValueCall {
        indexId: U256::from(condition.index_id()),
    }
    .abi_encode();

    let probe: Bytes = IOrderProtocol::arbitraryStaticCallCall {
        target: oracle,
        callData: inner.into(),
    }
    .abi_encode()
    .into();

    let threshold = condition.threshold();
    match condition.operator() {
        Operator::Gt | Operator::Gte => IOrderProtocol::gtCall {
            value: threshold,
            callData: probe,
        }
        .abi_encode()
        .into(),
        Operator::Lt | Operator::Lte => IOrderProtocol::ltCall {
            value: threshold,
            callData: probe,
        }
        .abi_encode()
        .into(),
        Operator::Eq => IOrderProtocol::eqCall {
            value: threshold,
            callData: probe,
        }
        .abi_encode()
        .into(),
        Operator::Neq => IOrderProtocol::notCall {
            callData: IOrderProtocol::eqCall {
                value: threshold,
                callData: probe,
            }
            .abi_encode()
            .into(),
        }
        .abi_encode()
        .into(),
    }
}
