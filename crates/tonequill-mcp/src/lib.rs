//! JSON-RPC tool server exposing [`tonequill_core`] as a closed catalog of
//! MCP tools. See [`tools::TonequillMcp`] for the tool implementations and
//! [`params`] for their argument schemas.

pub mod params;
pub mod tools;
