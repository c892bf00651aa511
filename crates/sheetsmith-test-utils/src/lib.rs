//! Testing utilities for the Sheetsmith workspace
//!
//! Shared fixtures, a scripted completion transport, and proptest
//! strategies for profiles.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use proptest::prelude::*;
use sheetsmith_core::{OrchestratorConfig, ProviderOrchestrator, ProviderRegistry};
use sheetsmith_model::{
    ColumnDescriptor, ColumnType, FormulaRef, Profile, SheetProfile, StageModels,
};
use sheetsmith_providers::{
    CompletionRequest, CompletionTransport, ProviderError, RemoteEndpointConfig,
    RemoteModelProvider,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Reply with a passing `app.py` and matching requirements
pub const VALID_REPLY: &str = r#"Here is the application.

FILENAME: app.py
CONTENT:
import pandas as pd
import streamlit as st


def main():
    st.title("Budget Tracker")
    uploaded = st.file_uploader("Upload workbook", type=["xlsx"])
    if uploaded is None:
        return
    try:
        sheets = pd.read_excel(uploaded, sheet_name=None)
    except Exception as exc:
        st.error(f"Could not read workbook: {exc}")
        return
    for name, frame in sheets.items():
        st.subheader(name)
        st.dataframe(frame)


if __name__ == "__main__":
    main()
====
FILENAME: requirements.txt
CONTENT:
streamlit>=1.22.0
pandas>=2.0.0
====
"#;

/// Reply whose code is well-formed but spawns a shell command
pub const FORBIDDEN_REPLY: &str = r#"FILENAME: app.py
CONTENT:
import os

import pandas as pd
import streamlit as st


def main():
    st.title("Cleanup")
    try:
        frame = pd.DataFrame({"a": [1, 2]})
        st.dataframe(frame)
    except Exception as exc:
        st.error(str(exc))
    os.system("rm -rf /tmp/cache")


main()
====
FILENAME: requirements.txt
CONTENT:
streamlit
pandas
====
"#;

/// Reply that reaches a process call through a wildcard import
pub const WILDCARD_FORBIDDEN_REPLY: &str = r#"FILENAME: app.py
CONTENT:
from os import *

import streamlit as st


def main():
    st.title("Cleanup")
    try:
        system("rm -rf /tmp/cache")
    except OSError as exc:
        st.error(str(exc))


main()
====
FILENAME: requirements.txt
CONTENT:
streamlit
====
"#;

/// Reply whose code does not parse
pub const SYNTAX_ERROR_REPLY: &str = r#"```python
import streamlit as st

def main(:
    st.title("broken"
```
"#;

/// Reply with no extractable code
pub const UNPARSEABLE_REPLY: &str = "I'm sorry, I can't produce an application for this workbook.";

const FINANCIAL_FORMULAS: [(&str, &str); 29] = [
    ("B2", "=SUM(B3:B20)"),
    ("B21", "=SUM(Income!C2:C40)"),
    ("C21", "=SUM(Expenses!C2:C40)"),
    ("D21", "=C21-B21"),
    ("E2", "=AVERAGE(B2:B13)"),
    ("E3", "=MAX(B2:B13)"),
    ("E4", "=MIN(B2:B13)"),
    ("E5", "=COUNT(B2:B13)"),
    ("F2", "=IF(B2>C2,\"Surplus\",\"Deficit\")"),
    ("F3", "=IF(AND(B3>0,C3>0),B3/C3,0)"),
    ("F4", "=IF(OR(B4=0,C4=0),\"n/a\",B4-C4)"),
    ("F5", "=NOT(ISBLANK(B5))"),
    ("G2", "=VLOOKUP(A2,Categories!A:B,2,FALSE)"),
    ("G3", "=INDEX(Categories!B:B,MATCH(A3,Categories!A:A,0))"),
    ("G4", "=HLOOKUP(\"Q1\",Quarters!A1:E2,2,FALSE)"),
    ("H2", "=PMT(0.05/12,360,-250000)"),
    ("H3", "=FV(0.04/12,120,-500)"),
    ("H4", "=PV(0.06,10,-1000)"),
    ("H5", "=NPV(0.08,B2:B6)"),
    ("H6", "=IRR(B2:B8)"),
    ("I2", "=B2*1.2"),
    ("I3", "=ROUND(B3,2)"),
    ("I4", "=TODAY()"),
    ("I5", "=B5&\" total\""),
    ("J2", "=SUM(J3:J14)"),
    ("J3", "=AVERAGE(Expenses!C2:C40)"),
    ("J4", "=IF(J2>10000,\"High\",\"Normal\")"),
    ("J5", "=VLOOKUP(A5,Rates!A:C,3,TRUE)"),
    ("J6", "=SUM(Income!C2:C40)-SUM(Expenses!C2:C40)"),
];

/// Financial workbook: 3 sheets, 29 formulas, tagged `financial`
pub fn financial_profile() -> Profile {
    let mut profile = Profile::new()
        .with_source_name("household_budget.xlsx")
        .with_domain("financial", 0.9)
        .with_flags(true, false)
        .with_sheet(
            SheetProfile::new("Summary")
                .with_column(ColumnDescriptor::new("Month", ColumnType::Date))
                .with_column(ColumnDescriptor::new("Income", ColumnType::Numeric))
                .with_column(ColumnDescriptor::new("Expenses", ColumnType::Numeric))
                .with_column(ColumnDescriptor::new("Net", ColumnType::Numeric))
                .with_rows(13),
        )
        .with_sheet(
            SheetProfile::new("Income")
                .with_columns(["Date", "Source", "Amount"])
                .with_rows(40),
        )
        .with_sheet(
            SheetProfile::new("Expenses")
                .with_columns(["Date", "Category", "Amount", "Notes"])
                .with_rows(40),
        );
    for (cell, expression) in FINANCIAL_FORMULAS {
        profile = profile.with_formula(FormulaRef::new("Summary", cell, expression));
    }
    profile
}

/// Profile with no sheets, formulas or domain
pub fn empty_profile() -> Profile {
    Profile::new()
}

/// Scripted transport
///
/// Replies are consumed in order; the last one repeats once the script
/// runs out. An empty script fails every call with `network`.
#[derive(Debug, Default)]
pub struct StaticTransport {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    last: Mutex<Option<Result<String, ProviderError>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl StaticTransport {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String, ProviderError>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Always reply with `text`
    pub fn replying(text: &str) -> Self {
        Self::new([Ok(text.to_string())])
    }

    /// Always fail with `error`
    pub fn failing(error: ProviderError) -> Self {
        Self::new([Err(error)])
    }

    /// Sleep before every reply
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionTransport for StaticTransport {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().pop_front();
        let mut last = self.last.lock();
        if let Some(reply) = next {
            *last = Some(reply);
        }
        last.clone()
            .unwrap_or_else(|| Err(ProviderError::Network("no scripted reply".to_string())))
    }
}

/// Single-stage endpoint for a scripted remote provider
pub fn scripted_endpoint(id: &str) -> RemoteEndpointConfig {
    RemoteEndpointConfig::new(id, "http://127.0.0.1:9/v1", "SHEETSMITH_TEST_KEY").single_stage()
}

/// Remote provider backed by `transport`
pub fn remote_provider(id: &str, transport: Arc<StaticTransport>) -> RemoteModelProvider {
    RemoteModelProvider::new(
        scripted_endpoint(id),
        StageModels::new("test-analysis", "test-generation"),
        transport,
    )
}

/// Config with `priority` and the scripted endpoints it names
pub fn test_config(priority: &[&str]) -> OrchestratorConfig {
    OrchestratorConfig::default()
        .with_priority(priority.iter().copied())
        .with_remote(Vec::new())
}

/// Orchestrator whose remote providers are scripted transports
pub fn setup_orchestrator(
    priority: &[&str],
    remotes: Vec<(&str, Arc<StaticTransport>)>,
) -> ProviderOrchestrator {
    let mut registry = ProviderRegistry::new();
    for (id, transport) in remotes {
        registry.register(remote_provider(id, transport)).unwrap();
    }
    ProviderOrchestrator::new(test_config(priority), &registry).unwrap()
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("   ".to_string()),
        Just("\"\"\"".to_string()),
        Just("'; import os; os.system('x') #".to_string()),
        Just("{name}\\n\\t".to_string()),
        "[a-zA-Z0-9 _-]{1,16}",
        any::<String>(),
    ]
}

prop_compose! {
    fn arb_sheet()(
        name in arb_text(),
        columns in prop::collection::vec(arb_text(), 0..6),
        rows in 0usize..10_000,
    ) -> SheetProfile {
        SheetProfile::new(name).with_columns(columns).with_rows(rows)
    }
}

prop_compose! {
    fn arb_formula()(sheet in arb_text(), cell in "[A-Z]{1,2}[0-9]{1,3}", expression in arb_text()) -> FormulaRef {
        FormulaRef::new(sheet, cell, expression)
    }
}

fn arb_domain() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("financial".to_string()),
        Just("sales".to_string()),
        Just("inventory".to_string()),
        Just("hr".to_string()),
        Just("project".to_string()),
        Just("generic".to_string()),
        arb_text(),
    ]
}

fn arb_confidence() -> impl Strategy<Value = f64> {
    prop_oneof![
        0.0f64..=1.0,
        Just(f64::NAN),
        Just(-1.0),
        Just(7.5),
        Just(f64::INFINITY),
    ]
}

prop_compose! {
    /// Arbitrary profile, including degenerate and hostile shapes
    pub fn arb_profile()(
        source in prop::option::of(arb_text()),
        sheets in prop::collection::vec(arb_sheet(), 0..5),
        formulas in prop::collection::vec(arb_formula(), 0..12),
        domain in arb_domain(),
        confidence in arb_confidence(),
        charts in any::<bool>(),
        macros in any::<bool>(),
    ) -> Profile {
        let mut profile = Profile::new()
            .with_domain(domain, confidence)
            .with_flags(charts, macros);
        if let Some(source) = source {
            profile = profile.with_source_name(source);
        }
        for sheet in sheets {
            profile = profile.with_sheet(sheet);
        }
        for formula in formulas {
            profile = profile.with_formula(formula);
        }
        profile
    }
}

/// Sheet count, formula count, domain confidence and advisory count
pub fn arb_counts() -> impl Strategy<Value = (usize, usize, f64, usize)> {
    (0usize..20, 0usize..200, 0.0f64..=1.0, 0usize..30)
}
