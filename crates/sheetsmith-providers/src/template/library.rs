//! Domain template library
//!
//! Each template supplies the per-sheet view; the surrounding program is
//! shared (see [`super::TemplateProvider`]).

use sheetsmith_model::DomainTag;

/// One domain template
#[derive(Debug)]
pub struct DomainTemplate {
    /// Domain key, matches [`DomainTag::as_str`]
    pub key: &'static str,
    /// Application title
    pub title: &'static str,
    /// File uploader label
    pub upload_label: &'static str,
    /// Hint shown before a file is uploaded
    pub empty_hint: &'static str,
    /// Whether the sheet view draws plotly charts
    pub uses_plotly: bool,
    /// Body of `render_sheet(sheet_name, df)`, indented one level
    pub sheet_view: &'static str,
}

impl DomainTemplate {
    /// External modules the rendered program imports
    #[must_use]
    pub fn imports(&self) -> Vec<&'static str> {
        if self.uses_plotly {
            vec!["pandas", "plotly", "streamlit"]
        } else {
            vec!["pandas", "streamlit"]
        }
    }
}

/// Template for a domain tag; generic and unrecognized tags share one
#[must_use]
pub fn template_for(tag: &DomainTag) -> &'static DomainTemplate {
    match tag {
        DomainTag::Financial => &FINANCIAL,
        DomainTag::Sales => &SALES,
        DomainTag::Inventory => &INVENTORY,
        DomainTag::Hr => &HR,
        DomainTag::Project => &PROJECT,
        DomainTag::Generic | DomainTag::Unrecognized(_) => &GENERIC,
    }
}

/// Every template, generic last
pub static LIBRARY: [&DomainTemplate; 6] = [&FINANCIAL, &SALES, &INVENTORY, &HR, &PROJECT, &GENERIC];

static FINANCIAL: DomainTemplate = DomainTemplate {
    key: "financial",
    title: "Financial Dashboard",
    upload_label: "Upload financial data",
    empty_hint: "Upload a financial workbook to begin analysis.",
    uses_plotly: true,
    sheet_view: r#"    numeric_cols = df.select_dtypes(include=["number"]).columns
    left, right = st.columns([2, 1])
    with left:
        st.dataframe(df, use_container_width=True)
    with right:
        st.metric("Rows", len(df))
        for col in numeric_cols[:3]:
            st.metric(f"{col} total", f"{df[col].sum():,.2f}")
    if len(numeric_cols) > 0:
        fig = px.line(df, y=list(numeric_cols[:3]), title=f"{sheet_name} trends")
        st.plotly_chart(fig, use_container_width=True)
"#,
};

static SALES: DomainTemplate = DomainTemplate {
    key: "sales",
    title: "Sales Analytics",
    upload_label: "Upload sales data",
    empty_hint: "Upload sales data to begin analysis.",
    uses_plotly: true,
    sheet_view: r#"    st.dataframe(df, use_container_width=True)
    numeric_cols = df.select_dtypes(include=["number"]).columns
    if len(numeric_cols) == 0:
        st.caption("No numeric columns to summarize.")
        return
    value = numeric_cols[0]
    total, average, peak, low = st.columns(4)
    total.metric("Total", f"{df[value].sum():,.2f}")
    average.metric("Average", f"{df[value].mean():,.2f}")
    peak.metric("Max", f"{df[value].max():,.2f}")
    low.metric("Min", f"{df[value].min():,.2f}")
    text_cols = df.select_dtypes(exclude=["number"]).columns
    if len(text_cols) > 0:
        grouped = df.groupby(text_cols[0], as_index=False)[value].sum()
        fig = px.bar(grouped, x=text_cols[0], y=value, title=f"{value} by {text_cols[0]}")
        st.plotly_chart(fig, use_container_width=True)
"#,
};

static INVENTORY: DomainTemplate = DomainTemplate {
    key: "inventory",
    title: "Inventory Management",
    upload_label: "Upload inventory data",
    empty_hint: "Upload inventory data to begin management.",
    uses_plotly: false,
    sheet_view: r#"    st.dataframe(df, use_container_width=True)
    items, unique, quantity = st.columns(3)
    items.metric("Total items", len(df))
    unique.metric("Unique products", df.iloc[:, 0].nunique() if len(df.columns) > 0 else 0)
    numeric_cols = df.select_dtypes(include=["number"]).columns
    if len(numeric_cols) > 0:
        stock = numeric_cols[0]
        quantity.metric("Total quantity", int(df[stock].fillna(0).sum()))
        threshold = st.number_input("Low stock threshold", min_value=0, value=10, key=f"threshold_{sheet_name}")
        low_stock = df[df[stock] < threshold]
        if not low_stock.empty:
            st.warning(f"{len(low_stock)} items below threshold")
            st.dataframe(low_stock, use_container_width=True)
"#,
};

static HR: DomainTemplate = DomainTemplate {
    key: "hr",
    title: "HR Management",
    upload_label: "Upload HR data",
    empty_hint: "Upload HR data to begin management.",
    uses_plotly: false,
    sheet_view: r#"    st.dataframe(df, use_container_width=True)
    headcount, groups, average = st.columns(3)
    headcount.metric("Employees", len(df))
    if len(df.columns) > 1:
        groups.metric("Groups", df.iloc[:, 1].nunique())
    numeric_cols = df.select_dtypes(include=["number"]).columns
    if len(numeric_cols) > 0:
        average.metric(f"Average {numeric_cols[0]}", f"{df[numeric_cols[0]].mean():,.2f}")
    query = st.text_input("Search", key=f"search_{sheet_name}")
    if query:
        mask = df.astype(str).apply(lambda row: row.str.contains(query, case=False, regex=False).any(), axis=1)
        st.dataframe(df[mask], use_container_width=True)
"#,
};

static PROJECT: DomainTemplate = DomainTemplate {
    key: "project",
    title: "Project Management",
    upload_label: "Upload project data",
    empty_hint: "Upload project data to begin management.",
    uses_plotly: false,
    sheet_view: r#"    st.dataframe(df, use_container_width=True)
    total, done, rate = st.columns(3)
    total.metric("Items", len(df))
    status_cols = [c for c in df.columns if "status" in str(c).lower()]
    if status_cols:
        finished = df[status_cols[0]].astype(str).str.lower().isin(["done", "complete", "completed", "closed"])
        completed = int(finished.sum())
        done.metric("Completed", completed)
        rate.metric("Completion rate", f"{completed / max(len(df), 1):.0%}")
    else:
        rate.metric("Completion rate", "N/A")
"#,
};

static GENERIC: DomainTemplate = DomainTemplate {
    key: "generic",
    title: "Data Explorer",
    upload_label: "Upload a data file",
    empty_hint: "Upload a data file to begin exploration.",
    uses_plotly: true,
    sheet_view: r#"    rows, cols, missing = st.columns(3)
    rows.metric("Rows", len(df))
    cols.metric("Columns", len(df.columns))
    missing.metric("Missing values", int(df.isnull().sum().sum()))
    st.dataframe(df, use_container_width=True)
    numeric_cols = df.select_dtypes(include=["number"]).columns
    if len(numeric_cols) > 0:
        st.dataframe(df[numeric_cols].describe(), use_container_width=True)
        selected = st.selectbox("Column", list(numeric_cols), key=f"col_{sheet_name}")
        fig = px.histogram(df, x=selected, title=f"Distribution of {selected}")
        st.plotly_chart(fig, use_container_width=True)
"#,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_select_templates() {
        assert_eq!(template_for(&DomainTag::Financial).key, "financial");
        assert_eq!(template_for(&DomainTag::Hr).key, "hr");
        assert_eq!(
            template_for(&DomainTag::Unrecognized("astrology".into())).key,
            "generic"
        );
    }

    #[test]
    fn keys_match_domain_tags() {
        for template in LIBRARY {
            let tag = DomainTag::from(template.key);
            assert!(std::ptr::eq(template_for(&tag), template));
        }
    }
}
