use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Client, Order, Snapshot};
use crate::query::recency::latest_failed_reason;

/// Wildcard option value used by the filter pickers.
pub const ALL: &str = "all";

/// One filterable dimension of the analytics view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FacetKind {
    ActivityType,
    Region,
    City,
    ProductCategory,
    ClientType,
    Tag,
    RefusalReason,
    DeliveryMethod,
    OrderStatus,
}

/// Which entity a facet is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetScope {
    Client,
    Order,
}

impl FacetKind {
    pub const ALL: [FacetKind; 9] = [
        FacetKind::ActivityType,
        FacetKind::Region,
        FacetKind::City,
        FacetKind::ProductCategory,
        FacetKind::ClientType,
        FacetKind::Tag,
        FacetKind::RefusalReason,
        FacetKind::DeliveryMethod,
        FacetKind::OrderStatus,
    ];

    /// The camelCase key used by the front-end filter record.
    pub fn key(&self) -> &'static str {
        match self {
            FacetKind::ActivityType => "activityType",
            FacetKind::Region => "region",
            FacetKind::City => "city",
            FacetKind::ProductCategory => "productCategory",
            FacetKind::ClientType => "clientType",
            FacetKind::Tag => "tag",
            FacetKind::RefusalReason => "refusalReason",
            FacetKind::DeliveryMethod => "deliveryMethod",
            FacetKind::OrderStatus => "orderStatus",
        }
    }

    /// Parse a facet key. camelCase, kebab-case and snake_case are accepted.
    pub fn parse(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        FacetKind::ALL
            .into_iter()
            .find(|k| k.key().to_lowercase() == normalized)
            .ok_or_else(|| Error::FilterParse(format!("unknown facet: {s}")))
    }

    pub fn scope(&self) -> FacetScope {
        match self {
            FacetKind::DeliveryMethod | FacetKind::OrderStatus => FacetScope::Order,
            _ => FacetScope::Client,
        }
    }

    /// Facets whose field holds a delimited list of values.
    pub fn is_multi_value(&self) -> bool {
        matches!(self, FacetKind::ProductCategory)
    }

    fn client_value<'a>(&self, client: &'a Client) -> Option<&'a str> {
        match self {
            FacetKind::ActivityType => client.activity_type.as_deref(),
            FacetKind::Region => client.region.as_deref(),
            FacetKind::City => client.city.as_deref(),
            FacetKind::ProductCategory => client.product_category.as_deref(),
            FacetKind::ClientType => client.client_type.as_deref(),
            FacetKind::Tag => client.status.as_deref(),
            FacetKind::RefusalReason => latest_failed_reason(client),
            FacetKind::DeliveryMethod | FacetKind::OrderStatus => None,
        }
    }

    fn order_value<'a>(&self, order: &'a Order) -> Option<&'a str> {
        match self {
            FacetKind::DeliveryMethod => order.delivery_method.as_deref(),
            FacetKind::OrderStatus => order.status.as_deref(),
            _ => None,
        }
    }

    /// Does a raw field value satisfy the wanted option?
    fn accepts(&self, wanted: &str, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        if self.is_multi_value() {
            split_multi(actual).any(|v| v == wanted)
        } else {
            actual.trim() == wanted
        }
    }
}

impl std::fmt::Display for FacetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Split a multi-value field on `,`, `;` or newlines, trimming entries and
/// dropping empty ones.
pub fn split_multi(s: &str) -> impl Iterator<Item = &str> {
    s.split([',', ';', '\n'])
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// A facet setting: the wildcard or one concrete option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Only(String),
}

impl Selection {
    /// `"all"` and blank strings are the wildcard.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s == ALL {
            Selection::All
        } else {
            Selection::Only(s.to_string())
        }
    }
}

/// The active facet filters. Facets not present are `All`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Filters {
    selected: BTreeMap<FacetKind, String>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter; `"all"` clears the facet.
    pub fn with(mut self, kind: FacetKind, value: &str) -> Self {
        self.set(kind, Selection::parse(value));
        self
    }

    pub fn set(&mut self, kind: FacetKind, selection: Selection) {
        match selection {
            Selection::All => {
                self.selected.remove(&kind);
            }
            Selection::Only(v) => {
                self.selected.insert(kind, v);
            }
        }
    }

    pub fn get(&self, kind: FacetKind) -> Selection {
        match self.selected.get(&kind) {
            Some(v) => Selection::Only(v.clone()),
            None => Selection::All,
        }
    }

    /// Build from string key/value pairs as held by the UI filter record.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut filters = Self::new();
        for (key, value) in pairs {
            filters.set(FacetKind::parse(key)?, Selection::parse(value));
        }
        Ok(filters)
    }

    pub fn is_unfiltered(&self) -> bool {
        self.selected.is_empty()
    }

    /// Facets set to a concrete option, in declaration order.
    pub fn active(&self) -> impl Iterator<Item = (FacetKind, &str)> {
        self.selected.iter().map(|(k, v)| (*k, v.as_str()))
    }

    fn active_in(&self, scope: FacetScope) -> impl Iterator<Item = (FacetKind, &str)> {
        self.active().filter(move |(k, _)| k.scope() == scope)
    }
}

/// Client lookup by id, built once per pipeline run.
pub struct ClientIndex<'a> {
    by_id: HashMap<&'a str, &'a Client>,
}

impl<'a> ClientIndex<'a> {
    pub fn new(clients: &'a [Client]) -> Self {
        Self {
            by_id: clients.iter().map(|c| (c.id.as_str(), c)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&'a Client> {
        self.by_id.get(id).copied()
    }

    /// The client an order belongs to, if it is known.
    pub fn owner_of(&self, order: &Order) -> Option<&'a Client> {
        order.client_id.as_deref().and_then(|id| self.get(id))
    }
}

pub fn matches_client_filters(client: &Client, filters: &Filters) -> bool {
    filters
        .active_in(FacetScope::Client)
        .all(|(kind, wanted)| kind.accepts(wanted, kind.client_value(client)))
}

/// Order-level facets must match; if the owning client is known it must also
/// pass the client-level facets.
pub fn matches_order_filters(order: &Order, filters: &Filters, clients: &ClientIndex<'_>) -> bool {
    let order_ok = filters
        .active_in(FacetScope::Order)
        .all(|(kind, wanted)| kind.accepts(wanted, kind.order_value(order)));
    if !order_ok {
        return false;
    }
    match clients.owner_of(order) {
        Some(client) => matches_client_filters(client, filters),
        None => true,
    }
}

/// Distinct option values present in the data for a facet, sorted.
pub fn facet_options(snapshot: &Snapshot, kind: FacetKind) -> Vec<String> {
    let mut values = BTreeSet::new();
    let mut add = |raw: Option<&str>| {
        let Some(raw) = raw else { return };
        if kind.is_multi_value() {
            values.extend(split_multi(raw).map(str::to_string));
        } else {
            let v = raw.trim();
            if !v.is_empty() {
                values.insert(v.to_string());
            }
        }
    };
    match kind.scope() {
        FacetScope::Client => snapshot
            .clients
            .iter()
            .for_each(|c| add(kind.client_value(c))),
        FacetScope::Order => snapshot
            .orders
            .iter()
            .for_each(|o| add(kind.order_value(o))),
    }
    values.into_iter().collect()
}
