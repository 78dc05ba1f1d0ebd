//! # Contract Definitions
//!
//! The slice of the Kurukshetra arena ABI the automation uses.

// The sol! macro generates code that we can't document, so allow missing_docs
#![allow(missing_docs)]

use alloy_sol_types::sol;

sol! {
    /// A single arena between two Yodhas.
    ///
    /// Rounds start at 0 (not started), run 1..=5 and read 6 once the last
    /// round has been fought. `battle` only accepts moves signed by the
    /// arena's game master key.
    #[derive(Debug)]
    interface IKurukshetra {
        /// Closes betting and moves the arena to round 1.
        function startGame() external;

        /// Plays one round. `signature` is an EIP-191 signature over
        /// `keccak256(abi.encodePacked(yodhaOneMove, yodhaTwoMove))`.
        function battle(uint8 yodhaOneMove, uint8 yodhaTwoMove, bytes signature) external;

        /// The current round counter.
        function getCurrentRound() external view returns (uint8);

        /// Damage accumulated by Yodha one.
        function getDamageOnYodhaOne() external view returns (uint256);

        /// Damage accumulated by Yodha two.
        function getDamageOnYodhaTwo() external view returns (uint256);
    }
}
