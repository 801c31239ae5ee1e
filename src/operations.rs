//! Typed operations for the Codex token and market data schema.
//!
//! A hand-maintained slice of the remote schema covering the common
//! network, token, and price fields plus the price/event subscriptions.
//! Each operation is a unit struct implementing
//! [`GraphqlOperation`](crate::GraphqlOperation); variables and response
//! types mirror the wire shape with camelCase field names.

use serde::{Deserialize, Serialize};

use crate::operation::GraphqlOperation;

/// Empty variables for operations without inputs.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NoVariables {}

/// A blockchain network indexed by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Network identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
}

/// Response data for [`GetNetworks`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetNetworksData {
    /// Networks available to the API key.
    pub get_networks: Vec<Network>,
}

/// List the networks available to the API key.
pub struct GetNetworks;

impl GraphqlOperation for GetNetworks {
    type Variables = NoVariables;
    type ResponseData = GetNetworksData;

    const QUERY: &'static str = "query GetNetworks { getNetworks { id name } }";
    const OPERATION_NAME: &'static str = "GetNetworks";
}

/// Token metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    /// Contract address.
    pub address: String,
    /// Network the token lives on.
    pub network_id: i64,
    /// Token name, when known.
    #[serde(default)]
    pub name: Option<String>,
    /// Ticker symbol, when known.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Decimal places.
    #[serde(default)]
    pub decimals: Option<u32>,
    /// Total supply as a decimal string.
    #[serde(default)]
    pub total_supply: Option<String>,
}

/// Variables for [`GetTokenInfo`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTokenInfoVars {
    /// Contract address.
    pub address: String,
    /// Network identifier.
    pub network_id: i64,
}

/// Response data for [`GetTokenInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTokenInfoData {
    /// Token metadata, or `None` for unknown tokens.
    pub get_token_info: Option<TokenInfo>,
}

/// Fetch metadata for a single token.
pub struct GetTokenInfo;

impl GraphqlOperation for GetTokenInfo {
    type Variables = GetTokenInfoVars;
    type ResponseData = GetTokenInfoData;

    const QUERY: &'static str = "query GetTokenInfo($address: String!, $networkId: Int!) { \
         getTokenInfo(address: $address, networkId: $networkId) { \
         address networkId name symbol decimals totalSupply } }";
    const OPERATION_NAME: &'static str = "GetTokenInfo";
}

/// One token to price in [`GetTokenPrices`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceInput {
    /// Contract address.
    pub address: String,
    /// Network identifier.
    pub network_id: i64,
}

/// A token price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPrice {
    /// Contract address.
    pub address: String,
    /// Network identifier.
    pub network_id: i64,
    /// USD price.
    pub price_usd: f64,
    /// Unix timestamp of the observation.
    pub timestamp: i64,
}

/// Variables for [`GetTokenPrices`].
#[derive(Debug, Clone, Serialize)]
pub struct GetTokenPricesVars {
    /// Tokens to price.
    pub inputs: Vec<PriceInput>,
}

/// Response data for [`GetTokenPrices`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTokenPricesData {
    /// Prices, position-matched to the inputs; unknown tokens are `None`.
    pub get_token_prices: Vec<Option<TokenPrice>>,
}

/// Batch-fetch current token prices.
pub struct GetTokenPrices;

impl GraphqlOperation for GetTokenPrices {
    type Variables = GetTokenPricesVars;
    type ResponseData = GetTokenPricesData;

    const QUERY: &'static str = "query GetTokenPrices($inputs: [GetPriceInput!]!) { \
         getTokenPrices(inputs: $inputs) { address networkId priceUsd timestamp } }";
    const OPERATION_NAME: &'static str = "GetTokenPrices";
}

/// Variables for [`FilterTokens`].
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterTokensVars {
    /// Free-text search phrase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phrase: Option<String>,
    /// Restrict to these networks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_ids: Option<Vec<i64>>,
    /// Page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Page offset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

/// One ranked result from [`FilterTokens`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterTokensResult {
    /// Token metadata.
    pub token: Option<TokenInfo>,
    /// Current USD price.
    #[serde(default)]
    pub price_usd: Option<f64>,
    /// 24h volume as a decimal string.
    #[serde(default)]
    pub volume24: Option<String>,
    /// 24h price change fraction.
    #[serde(default)]
    pub change24: Option<f64>,
}

/// Page of [`FilterTokens`] results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterTokensPage {
    /// Ranked results.
    pub results: Vec<FilterTokensResult>,
    /// Total result count, when the API reports one.
    #[serde(default)]
    pub count: Option<i64>,
}

/// Response data for [`FilterTokens`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterTokensData {
    /// Result page.
    pub filter_tokens: FilterTokensPage,
}

/// Search and rank tokens.
pub struct FilterTokens;

impl GraphqlOperation for FilterTokens {
    type Variables = FilterTokensVars;
    type ResponseData = FilterTokensData;

    const QUERY: &'static str = "query FilterTokens($phrase: String, $networkIds: [Int!], \
         $limit: Int, $offset: Int) { \
         filterTokens(phrase: $phrase, networkIds: $networkIds, limit: $limit, offset: $offset) { \
         results { token { address networkId name symbol decimals totalSupply } \
         priceUsd volume24 change24 } count } }";
    const OPERATION_NAME: &'static str = "FilterTokens";
}

/// Variables for [`OnPriceUpdated`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnPriceUpdatedVars {
    /// Contract address.
    pub address: String,
    /// Network identifier.
    pub network_id: i64,
}

/// Response data for [`OnPriceUpdated`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnPriceUpdatedData {
    /// The updated price.
    pub on_price_updated: TokenPrice,
}

/// Subscription: price ticks for a token.
pub struct OnPriceUpdated;

impl GraphqlOperation for OnPriceUpdated {
    type Variables = OnPriceUpdatedVars;
    type ResponseData = OnPriceUpdatedData;

    const QUERY: &'static str = "subscription OnPriceUpdated($address: String!, $networkId: Int!) { \
         onPriceUpdated(address: $address, networkId: $networkId) { \
         address networkId priceUsd timestamp } }";
    const OPERATION_NAME: &'static str = "OnPriceUpdated";
}

/// Variables for [`OnEventsCreated`].
#[derive(Debug, Clone, Serialize)]
pub struct OnEventsCreatedVars {
    /// Pair identifier (`<pairAddress>:<networkId>`).
    pub id: String,
}

/// A swap or transfer event on a pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairEvent {
    /// Event kind reported by the API.
    pub event_type: String,
    /// Maker address, when applicable.
    #[serde(default)]
    pub maker: Option<String>,
    /// Transaction hash.
    pub transaction_hash: String,
    /// Unix timestamp of the event.
    pub timestamp: i64,
}

/// Batch of events delivered by [`OnEventsCreated`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBatch {
    /// Pair identifier the events belong to.
    pub id: String,
    /// Events in arrival order.
    pub events: Vec<TokenPairEvent>,
}

/// Response data for [`OnEventsCreated`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnEventsCreatedData {
    /// The delivered batch.
    pub on_events_created: EventBatch,
}

/// Subscription: swap/transfer events for a pair.
pub struct OnEventsCreated;

impl GraphqlOperation for OnEventsCreated {
    type Variables = OnEventsCreatedVars;
    type ResponseData = OnEventsCreatedData;

    const QUERY: &'static str = "subscription OnEventsCreated($id: String!) { \
         onEventsCreated(id: $id) { id events { eventType maker transactionHash timestamp } } }";
    const OPERATION_NAME: &'static str = "OnEventsCreated";
}
