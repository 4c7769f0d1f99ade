use std::collections::HashSet;

use indexmap::IndexMap;

use crate::models::{
    ChartRecommendation, ChartType, ColumnInfo, ColumnStats, ColumnType, NumericStats, PeriodInfo,
};

const LINE_CHART_MAX_SERIES: usize = 4;
const TOP_VARIABLE_SERIES: usize = 3;
const BAR_CHART_CATEGORIES: usize = 2;
const BAR_MAX_UNIQUE: usize = 15;
const PIE_MAX_UNIQUE: usize = 6;
const STACK_MAX_UNIQUE: usize = 8;
const TABLE_MIN_COLUMNS: usize = 3;

struct Inputs<'a> {
    columns: &'a [ColumnInfo],
    stats: &'a IndexMap<String, ColumnStats>,
    numeric: Vec<&'a ColumnInfo>,
    categorical: Vec<&'a ColumnInfo>,
}

impl<'a> Inputs<'a> {
    fn sum(&self, column: &ColumnInfo) -> f64 {
        self.numeric_stat(column, |s| s.sum)
    }

    fn stddev(&self, column: &ColumnInfo) -> f64 {
        self.numeric_stat(column, |s| s.stddev)
    }

    fn numeric_stat(&self, column: &ColumnInfo, pick: impl Fn(&NumericStats) -> f64) -> f64 {
        self.stats
            .get(&column.name)
            .and_then(ColumnStats::as_numeric)
            .map_or(0.0, pick)
    }

    /// Cardinality from the stats entry, else from the column profile.
    fn cardinality(&self, column: &ColumnInfo) -> usize {
        self.stats
            .get(&column.name)
            .and_then(ColumnStats::unique_count)
            .filter(|&n| n > 0)
            .unwrap_or(column.unique_count)
    }

    /// The first numeric column with the strictly largest sum.
    fn headline(&self) -> Option<&'a ColumnInfo> {
        let mut best = *self.numeric.first()?;
        for &column in &self.numeric[1..] {
            if self.sum(column) > self.sum(best) {
                best = column;
            }
        }
        Some(best)
    }
}

fn chart(chart_type: ChartType, x_key: &str, y_keys: Vec<String>, title: String, reason: String) -> ChartRecommendation {
    ChartRecommendation {
        chart_type,
        x_key: Some(x_key.to_string()),
        y_keys,
        stack_key: None,
        columns: None,
        title,
        reason,
    }
}

/// Ranked, de-duplicated chart suggestions derived from the earlier stages.
pub fn suggest_charts(
    columns: &[ColumnInfo],
    periods: &PeriodInfo,
    stats: &IndexMap<String, ColumnStats>,
) -> Vec<ChartRecommendation> {
    let inputs = Inputs {
        columns,
        stats,
        numeric: columns.iter().filter(|c| c.column_type.is_numeric()).collect(),
        categorical: columns
            .iter()
            .filter(|c| c.column_type == ColumnType::Categorical)
            .collect(),
    };

    let mut charts = Vec::new();
    let period_column = periods.period_column.as_deref().filter(|_| periods.has_periods);
    let period_type = periods.period_type.map(|p| p.to_string()).unwrap_or_default();

    if let Some(period_column) = period_column {
        temporal_charts(&inputs, period_column, &period_type, &mut charts);
    }

    if let Some(main) = inputs.headline() {
        category_charts(&inputs, main, &mut charts);

        if let (Some(period_column), Some(&category)) = (period_column, inputs.categorical.first()) {
            let unique = inputs.cardinality(category);
            if unique <= STACK_MAX_UNIQUE {
                let mut stacked = chart(
                    ChartType::StackedBarChart,
                    period_column,
                    vec![main.name.clone()],
                    format!("{} by {} ({})", main.name, category.name, period_type),
                    format!("Composition of {} by {} over time", main.name, category.name),
                );
                stacked.stack_key = Some(category.name.clone());
                charts.push(stacked);
            }
        }
    }

    if !periods.has_periods && inputs.categorical.is_empty() && inputs.numeric.len() >= 2 {
        let x = inputs.numeric[0];
        charts.push(chart(
            ChartType::BarChart,
            &x.name,
            inputs.numeric[1..]
                .iter()
                .take(TOP_VARIABLE_SERIES)
                .map(|c| c.name.clone())
                .collect(),
            "Metric comparison".to_string(),
            "Direct comparison between numeric metrics".to_string(),
        ));
    }

    if inputs.columns.len() >= TABLE_MIN_COLUMNS {
        charts.push(ChartRecommendation {
            chart_type: ChartType::Table,
            x_key: None,
            y_keys: Vec::new(),
            stack_key: None,
            columns: Some(inputs.columns.iter().map(|c| c.name.clone()).collect()),
            title: "Detailed data".to_string(),
            reason: "Tabular view of the data with sorting and filtering".to_string(),
        });
    }

    dedupe(charts)
}

fn temporal_charts(inputs: &Inputs<'_>, period_column: &str, period_type: &str, charts: &mut Vec<ChartRecommendation>) {
    let numeric = &inputs.numeric;
    match numeric.len() {
        0 => return,
        1 => charts.push(chart(
            ChartType::AreaChart,
            period_column,
            vec![numeric[0].name.clone()],
            format!("Evolution of {}", numeric[0].name),
            format!("Time trend of {} ({})", numeric[0].name, period_type),
        )),
        n if n <= LINE_CHART_MAX_SERIES => charts.push(chart(
            ChartType::LineChart,
            period_column,
            numeric.iter().map(|c| c.name.clone()).collect(),
            "Indicator trends".to_string(),
            format!("Comparison of {} metrics over {} periods", n, period_type),
        )),
        _ => {
            let mut ranked = numeric.clone();
            // stable: equal spreads keep column order
            ranked.sort_by(|a, b| inputs.stddev(b).total_cmp(&inputs.stddev(a)));
            charts.push(chart(
                ChartType::LineChart,
                period_column,
                ranked
                    .iter()
                    .take(TOP_VARIABLE_SERIES)
                    .map(|c| c.name.clone())
                    .collect(),
                "Key indicators".to_string(),
                format!("Top 3 most variable metrics over {} periods", period_type),
            ));
        }
    }

    if numeric.len() > 1 {
        if let Some(main) = inputs.headline() {
            charts.push(chart(
                ChartType::AreaChart,
                period_column,
                vec![main.name.clone()],
                format!("Evolution of {}", main.name),
                format!("Trend of the headline metric ({})", main.name),
            ));
        }
    }
}

fn category_charts(inputs: &Inputs<'_>, main: &ColumnInfo, charts: &mut Vec<ChartRecommendation>) {
    for &category in inputs.categorical.iter().take(BAR_CHART_CATEGORIES) {
        let unique = inputs.cardinality(category);
        if unique > BAR_MAX_UNIQUE {
            continue;
        }
        charts.push(chart(
            ChartType::BarChart,
            &category.name,
            vec![main.name.clone()],
            format!("{} by {}", main.name, category.name),
            format!("Comparison of {} by {} ({} categories)", main.name, category.name, unique),
        ));
    }

    // at most one pie, on the first category narrow enough for one; a wide
    // leading category no longer rules the pie out
    let pie = inputs
        .categorical
        .iter()
        .map(|&category| (category, inputs.cardinality(category)))
        .find(|&(_, unique)| unique <= PIE_MAX_UNIQUE);
    if let Some((category, unique)) = pie {
        charts.push(chart(
            ChartType::PieChart,
            &category.name,
            vec![main.name.clone()],
            format!("Breakdown by {}", category.name),
            format!("Share of {} by {} ({} categories)", main.name, category.name, unique),
        ));
    }
}

/// Keep the first chart for every (type, x axis, sorted y axes) key.
fn dedupe(charts: Vec<ChartRecommendation>) -> Vec<ChartRecommendation> {
    let mut seen = HashSet::new();
    charts
        .into_iter()
        .filter(|chart| {
            let mut y_keys = chart.y_keys.clone();
            y_keys.sort();
            seen.insert((chart.chart_type, chart.x_key.clone().unwrap_or_default(), y_keys))
        })
        .collect()
}
