//! Integration tests for the routing, quoting and build tools.
//!
//! These run against the chain configured in the environment (Polygon by
//! default) and use its wrapped native and bridged USDC tokens.
//!
//! Run with: `cargo test --test test_swap_tools -- --ignored`

mod common;

use atlas_swap_mcp::mcp::{BuildSwapInput, GetSwapQuoteInput, GetSwapRoutesInput};
use rmcp::handler::server::wrapper::Parameters;

const WMATIC: &str = "0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270";
const USDC: &str = "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174";

fn parse(json: &str) -> serde_json::Value {
    serde_json::from_str(json).expect("tool output should be JSON")
}

/// USDC to the native token only has the direct route.
#[tokio::test]
#[ignore = "Requires network access and environment variables"]
async fn test_routes_usdc_to_native() {
    let server = skip_if_no_server!();

    let input = GetSwapRoutesInput { from_token: USDC.to_string(), to_token: "POL".to_string() };
    let result = server.get_swap_routes(Parameters(input)).await;
    assert!(result.is_ok(), "get_swap_routes should succeed: {:?}", result.err());

    let parsed = parse(&result.unwrap());
    let routes = parsed["routes"].as_array().unwrap();
    assert!(!routes.is_empty());
    assert!(routes.iter().all(|r| r["is_to_native"] == true));
    assert!(routes.iter().all(|r| r["path"].as_array().unwrap().len() == 2));
}

/// Identical tokens are rejected as invalid parameters.
#[tokio::test]
#[ignore = "Requires network access and environment variables"]
async fn test_routes_identical_tokens() {
    let server = skip_if_no_server!();

    let input = GetSwapRoutesInput { from_token: "POL".to_string(), to_token: WMATIC.to_string() };
    let result = server.get_swap_routes(Parameters(input)).await;

    let err = result.unwrap_err();
    assert!(err.message.contains("same"));
}

/// Exact-in quote for WMATIC to USDC.
#[tokio::test]
#[ignore = "Requires network access and environment variables"]
async fn test_quote_exact_in() {
    let server = skip_if_no_server!();

    let input = GetSwapQuoteInput {
        from_token: WMATIC.to_string(),
        to_token: USDC.to_string(),
        amount: "10".to_string(),
        direction: None,
    };
    let result = server.get_swap_quote(Parameters(input)).await;
    assert!(result.is_ok(), "get_swap_quote should succeed: {:?}", result.err());

    let json = result.unwrap();
    let parsed = parse(&json);
    assert_eq!(parsed["swap_type"], "exact_in");
    assert_eq!(parsed["amount_in"], "10");
    assert!(parsed.get("minimum_received").unwrap().is_string());
    assert!(parsed.get("price_impact").is_some());
    assert!(parsed["route"].get("path").is_some());

    println!("WMATIC->USDC Quote: {}", json);
}

/// Exact-out quote reports the maximum sold.
#[tokio::test]
#[ignore = "Requires network access and environment variables"]
async fn test_quote_exact_out() {
    let server = skip_if_no_server!();

    let input = GetSwapQuoteInput {
        from_token: WMATIC.to_string(),
        to_token: USDC.to_string(),
        amount: "5".to_string(),
        direction: Some("exact_out".to_string()),
    };
    let result = server.get_swap_quote(Parameters(input)).await;
    assert!(result.is_ok(), "get_swap_quote should succeed: {:?}", result.err());

    let parsed = parse(&result.unwrap());
    assert_eq!(parsed["swap_type"], "exact_out");
    assert_eq!(parsed["amount_out"], "5");
    assert!(parsed.get("maximum_sold").unwrap().is_string());
}

/// Native to wrapped native is a plain wrap.
#[tokio::test]
#[ignore = "Requires network access and environment variables"]
async fn test_quote_wrap() {
    let server = skip_if_no_server!();

    let input = GetSwapQuoteInput {
        from_token: "POL".to_string(),
        to_token: WMATIC.to_string(),
        amount: "1".to_string(),
        direction: None,
    };
    let parsed = parse(&server.get_swap_quote(Parameters(input)).await.unwrap());

    assert_eq!(parsed["swap_type"], "wrap");
    assert_eq!(parsed["amount_in"], parsed["amount_out"]);
}

/// Invalid direction is rejected before any lookup.
#[tokio::test]
#[ignore = "Requires network access and environment variables"]
async fn test_quote_invalid_direction() {
    let server = skip_if_no_server!();

    let input = GetSwapQuoteInput {
        from_token: WMATIC.to_string(),
        to_token: USDC.to_string(),
        amount: "1".to_string(),
        direction: Some("sideways".to_string()),
    };
    assert!(server.get_swap_quote(Parameters(input)).await.is_err());
}

/// Build a signed swap. Needs the Atlas contract addresses in the environment.
#[tokio::test]
#[ignore = "Requires network access and environment variables"]
async fn test_build_swap() {
    let server = skip_if_no_server!();
    if std::env::var("DAPP_CONTROL_ADDRESS").is_err() {
        eprintln!("Skipping test: Atlas contract addresses not set");
        return;
    }

    let input = BuildSwapInput {
        from_token: USDC.to_string(),
        to_token: WMATIC.to_string(),
        amount: "1".to_string(),
        direction: None,
        slippage_tolerance: Some("1.0".to_string()),
    };
    let result = server.build_swap(Parameters(input)).await;
    assert!(result.is_ok(), "build_swap should succeed: {:?}", result.err());

    let json = result.unwrap();
    let parsed = parse(&json);
    assert_eq!(parsed["signed"], true);
    assert!(parsed["baseline_call"].get("data").is_some());
    assert!(parsed["user_operation"]["signature"].as_str().unwrap().len() > 2);
    assert!(parsed["gas_limit"].as_u64().unwrap() > 0);
    assert_eq!(parsed["quote"]["slippage_tolerance"], "1.00%");

    println!("USDC->WMATIC Build Result: {}", json);
}

/// Out of range slippage is rejected.
#[tokio::test]
#[ignore = "Requires network access and environment variables"]
async fn test_build_swap_invalid_slippage() {
    let server = skip_if_no_server!();

    let input = BuildSwapInput {
        from_token: USDC.to_string(),
        to_token: WMATIC.to_string(),
        amount: "1".to_string(),
        direction: None,
        slippage_tolerance: Some("75".to_string()),
    };
    let err = server.build_swap(Parameters(input)).await.unwrap_err();
    assert!(err.message.contains("slippage_tolerance"));
}
