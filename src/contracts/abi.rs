//! Solidity interfaces of the three contracts the gateway talks to.

use alloy::sol;

sol! {
    /// The subset of ERC-20 used by the exchange flow.
    #[derive(Debug)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
    }

    /// Fixed-rate exchange between the external and internal token.
    ///
    /// Both entry points pull `amount` of the input token from the caller,
    /// so an allowance for the exchange contract must exist first.
    #[derive(Debug)]
    interface ITokenExchange {
        function exchangeEduToMyTokens(uint256 amount) external;
        function exchangeMyTokensToEdu(uint256 amount) external;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, U256};
    use alloy::sol_types::SolCall;

    #[test]
    fn test_erc20_selectors() {
        assert_eq!(IERC20::balanceOfCall::SELECTOR, [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(IERC20::approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
    }

    #[test]
    fn test_approve_calldata_layout() {
        let spender = address!("0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0");
        let call = IERC20::approveCall {
            spender,
            value: U256::from(42u8),
        };
        let data = call.abi_encode();

        assert_eq!(data.len(), 4 + 32 + 32);
        assert_eq!(&data[16..36], spender.as_slice());
        assert_eq!(data[67], 42);
    }

    #[test]
    fn test_exchange_entry_points_differ() {
        assert_ne!(
            ITokenExchange::exchangeEduToMyTokensCall::SELECTOR,
            ITokenExchange::exchangeMyTokensToEduCall::SELECTOR
        );
    }
}
