//! # CLI Interface
//!
//! Command-line arguments for `tessera-node` using `clap` derive. Every
//! simulation knob has an environment fallback so CI can tune a run without
//! editing the command line.

use clap::{Parser, Subcommand, ValueEnum};

use tessera_protocol::config::{
    ClientConfig, DEFAULT_CONFIRMED_DEPTH, DEFAULT_DIFFICULTY_BITS,
    DEFAULT_PROVISIONAL_EXPIRY_BLOCKS, DEFAULT_TREE_DEPTH,
};

/// Tessera devnet.
///
/// Runs a handful of shielded clients and a toy miner in one process,
/// connected by loopback gossip, and drives them through minting, paying
/// each other and catching up on the chain.
#[derive(Parser, Debug)]
#[command(
    name = "tessera-node",
    about = "Tessera shielded-coin devnet",
    version,
    propagate_version = true
)]
pub struct TesseraNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a devnet simulation and print a JSON summary on stdout.
    Simulate(SimulateArgs),
    /// Print version information and exit.
    Version,
}

/// Which proving backend the clients use.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProverKind {
    /// Real Groth16 proofs over BN254. Setup is slow at large depths.
    Groth16,
    /// Constraint checking only; proofs do not verify.
    Check,
}

/// Arguments for the `simulate` subcommand.
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Number of paying clients.
    #[arg(long, env = "TESSERA_CLIENTS", default_value_t = 3)]
    pub clients: usize,

    /// Payment rounds. Every client pays its neighbour once per round.
    #[arg(long, env = "TESSERA_ROUNDS", default_value_t = 3)]
    pub rounds: usize,

    /// Coins each client mints at startup.
    #[arg(long, env = "TESSERA_MINTS", default_value_t = 2)]
    pub mints: usize,

    /// Value of every minted coin.
    #[arg(long, env = "TESSERA_MINT_VALUE", default_value_t = 100)]
    pub mint_value: u64,

    /// Proof-of-work difficulty in leading zero bits.
    #[arg(long, env = "TESSERA_DIFFICULTY", default_value_t = DEFAULT_DIFFICULTY_BITS)]
    pub difficulty: u32,

    /// Depth of the commitment Merkle tree.
    #[arg(long, env = "TESSERA_TREE_DEPTH", default_value_t = DEFAULT_TREE_DEPTH)]
    pub tree_depth: usize,

    /// Blocks behind the head that count as confirmed.
    #[arg(long, env = "TESSERA_CONFIRMED_DEPTH", default_value_t = DEFAULT_CONFIRMED_DEPTH)]
    pub confirmed_depth: u64,

    /// Confirmed blocks a provisional coin may wait before eviction.
    #[arg(long, env = "TESSERA_EXPIRY", default_value_t = DEFAULT_PROVISIONAL_EXPIRY_BLOCKS)]
    pub expiry: u64,

    /// Proving backend.
    #[arg(long, env = "TESSERA_PROVER", value_enum, default_value_t = ProverKind::Check)]
    pub prover: ProverKind,

    /// Add a client that joins after the payments and syncs from its peers.
    #[arg(long, env = "TESSERA_LATE_JOINER")]
    pub late_joiner: bool,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "TESSERA_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(
        long,
        env = "TESSERA_LOG_LEVEL",
        default_value = "tessera_node=info,tessera_protocol=info"
    )]
    pub log_level: String,
}

impl SimulateArgs {
    /// The per-client configuration these flags describe.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            confirmed_depth: self.confirmed_depth,
            provisional_expiry_blocks: self.expiry,
            tree_depth: self.tree_depth,
            difficulty_bits: self.difficulty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        TesseraNodeCli::command().debug_assert();
    }

    #[test]
    fn simulate_flags_build_a_client_config() {
        let cli = TesseraNodeCli::parse_from([
            "tessera-node",
            "simulate",
            "--difficulty",
            "4",
            "--tree-depth",
            "8",
            "--confirmed-depth",
            "2",
            "--prover",
            "groth16",
        ]);
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.prover, ProverKind::Groth16);
        let config = args.client_config();
        assert_eq!(config.difficulty_bits, 4);
        assert_eq!(config.tree_depth, 8);
        assert_eq!(config.confirmed_depth, 2);
        assert_eq!(config.provisional_expiry_blocks, DEFAULT_PROVISIONAL_EXPIRY_BLOCKS);
    }
}
