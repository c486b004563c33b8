#[allow(clippy::too_many_arguments)]
pub mod oracle {
    alloy::sol!(
        #[derive(Debug)]
        #[sol(rpc)]
        interface IIndexOracle {
            struct IndexInfo {
                uint256 value;
                uint256 timestamp;
                bool active;
                string name;
                string description;
                address creator;
                uint256 createdAt;
            }

            event IndexCreated(uint256 indexed indexId, address indexed creator, uint256 initialValue);
            event IndexUpdated(uint256 indexed indexId, uint256 newValue, uint256 timestamp);

            function getIndexValue(uint256 indexId) external view returns (uint256 value, uint256 timestamp);
            function getIndexInfo(uint256 indexId) external view returns (IndexInfo memory info);
            function listIndexIds() external view returns (uint256[] memory ids);
            function createIndex(uint256 initialValue, string memory name, string memory description) external returns (uint256 indexId);
            function updateIndexValue(uint256 indexId, uint256 newValue) external;
        }
    );
}

#[allow(clippy::too_many_arguments)]
pub mod protocol {
    alloy::sol!(
        /// Order shape hashed and signed under the protocol's EIP-712 domain.
        /// `expiry` is an absolute unix timestamp, zero meaning no expiry.
        #[derive(Debug)]
        struct LimitOrder {
            uint256 salt;
            address maker;
            address receiver;
            address makerAsset;
            address takerAsset;
            uint256 makingAmount;
            uint256 takingAmount;
            uint256 expiry;
            bytes predicate;
        }

        #[derive(Debug)]
        #[sol(rpc)]
        interface IOrderProtocol {
            event OrderCancelled(bytes32 indexed orderHash);

            function cancelOrder(bytes32 orderHash) external;
            function remainingAmount(bytes32 orderHash) external view returns (uint256);

            function gt(uint256 value, bytes memory callData) external view returns (bool);
            function lt(uint256 value, bytes memory callData) external view returns (bool);
            function eq(uint256 value, bytes memory callData) external view returns (bool);
            function not(bytes memory callData) external view returns (bool);
            function arbitraryStaticCall(address target, bytes memory callData) external view returns (uint256);
        }
    );
}

#[allow(clippy::too_many_arguments)]
pub mod token {
    alloy::sol!(
        #[derive(Debug)]
        #[sol(rpc)]
        interface IERC20 {
            event Transfer(address indexed from, address indexed to, uint256 value);
            event Approval(address indexed owner, address indexed spender, uint256 value);

            function name() external view returns (string memory);
            function symbol() external view returns (string memory);
            function decimals() external view returns (uint8);
            function totalSupply() external view returns (uint256);
            function balanceOf(address owner) external view returns (uint256);
            function allowance(address owner, address spender) external view returns (uint256);
            function approve(address spender, uint256 value) external returns (bool);
            function transfer(address to, uint256 value) external returns (bool);
            function mint(address to, uint256 value) external;
        }
    );
}

/// Revert signatures shared by the oracle and the order protocol, kept in one
/// place so provider errors can be decoded against a single interface.
pub mod errors {
    alloy::sol!(
        #[derive(Debug)]
        interface Protocol {
            error IndexNotFound(uint256 indexId);
            error IndexInactive(uint256 indexId);
            error UnknownOrder(bytes32 orderHash);
            error AccessDenied(address caller);
            error PredicateFailed();
        }
    );
}
