//! Definitions of Solidity functions called during deployment

use alloy_sol_types::sol;

sol! {
    function setTokenType(uint256 tokenType, address implementation, uint256 cost) external;
    function setTokenTypeAndExternalGenerators(uint256 tokenType, address implementation, uint256 cost, address[] externalGenerators) external;
    function changeOwner(address newOwner) external;
}
