//! Chart series for the statistics page.

use std::collections::HashMap;

use rusqlite::Connection;
use serde::Serialize;

use crate::{
    Error,
    ledger::models::EntryKind,
    stats::{RangeFilter, period::QUARTER},
};

/// An income/expense pair of series over shared labels.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct TrendSeries {
    /// The x-axis labels.
    pub labels: Vec<String>,
    /// The income value per label.
    pub income: Vec<f64>,
    /// The expense value per label.
    pub expense: Vec<f64>,
}

/// Labels and values for a pie chart.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct PieSeries {
    /// The slice labels.
    pub labels: Vec<String>,
    /// The slice values.
    pub data: Vec<f64>,
}

/// The category pies: the largest expense and income categories.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct CategoryPies {
    /// The top expense categories.
    pub expense: PieSeries,
    /// The top income categories.
    pub income: PieSeries,
}

/// The monthly balance series, with the net per month.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct BalanceSeries {
    /// The month labels.
    pub labels: Vec<String>,
    /// The income per month.
    pub income: Vec<f64>,
    /// The expense per month.
    pub expense: Vec<f64>,
    /// Income minus expense per month.
    pub net: Vec<f64>,
}

/// The income/expense comparison across the household members.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct OwnerSeries {
    /// The member names.
    pub labels: Vec<String>,
    /// The income per member.
    pub income: Vec<f64>,
    /// The expense per member.
    pub expense: Vec<f64>,
}

/// The comparison block of the chart payload.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct Comparison {
    /// The monthly balance series.
    pub balance: BalanceSeries,
    /// The per-member series.
    pub owners: OwnerSeries,
}

/// Everything the statistics page charts.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct ChartData {
    /// The monthly trend.
    pub monthly: TrendSeries,
    /// The quarterly trend, aggregated from the monthly series by
    /// position.
    pub quarterly: TrendSeries,
    /// The yearly trend.
    pub yearly: TrendSeries,
    /// The category pies.
    pub category: CategoryPies,
    /// The balance and member comparisons.
    pub comparison: Comparison,
}

fn pie(
    connection: &Connection,
    clause: &str,
    params: &[rusqlite::types::Value],
    kind: EntryKind,
    limit: u32,
) -> Result<PieSeries, Error> {
    let mut statement = connection.prepare(&format!(
        "SELECT category, COALESCE(SUM(amount), 0) AS total_amount
            FROM ledger_entry WHERE record_type = '{}'{clause}
            GROUP BY category
            ORDER BY total_amount DESC
            LIMIT {limit}",
        kind.as_str()
    ))?;
    let rows = statement
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut series = PieSeries::default();
    for (category, amount) in rows {
        series.labels.push(category);
        series.data.push(amount);
    }

    Ok(series)
}

fn quarter_of(values: &[f64], quarter: usize) -> f64 {
    values.iter().skip(quarter * 3).take(3).sum()
}

/// Build every chart series over the entries matching `filter`.
///
/// The quarterly series buckets the first three months of the range into
/// Q1 and so on regardless of the calendar quarter the months fall in,
/// which reads naturally when the range is a single year.
pub fn chart_data(
    connection: &Connection,
    filter: &RangeFilter,
    default_owners: &[String],
) -> Result<ChartData, Error> {
    let (clause, params) = filter.where_clause();

    // Monthly income and expense, sparse from SQL, then densified.
    let mut statement = connection.prepare(&format!(
        "SELECT strftime('%Y-%m', account_date) AS month, record_type,
            COALESCE(SUM(amount), 0)
            FROM ledger_entry WHERE 1=1{clause}
            GROUP BY month, record_type
            ORDER BY month"
    ))?;
    let monthly_rows = statement
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, EntryKind>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut months: Vec<String> = Vec::new();
    let mut income_by_month: HashMap<String, f64> = HashMap::new();
    let mut expense_by_month: HashMap<String, f64> = HashMap::new();
    for (month, kind, amount) in monthly_rows {
        if !months.contains(&month) {
            months.push(month.clone());
        }
        match kind {
            EntryKind::Income => income_by_month.insert(month, amount),
            EntryKind::Expense => expense_by_month.insert(month, amount),
        };
    }
    let monthly_income: Vec<f64> = months
        .iter()
        .map(|month| income_by_month.get(month).copied().unwrap_or(0.0))
        .collect();
    let monthly_expense: Vec<f64> = months
        .iter()
        .map(|month| expense_by_month.get(month).copied().unwrap_or(0.0))
        .collect();

    let quarterly = TrendSeries {
        labels: vec!["Q1".into(), "Q2".into(), "Q3".into(), "Q4".into()],
        income: (0..4).map(|q| quarter_of(&monthly_income, q)).collect(),
        expense: (0..4).map(|q| quarter_of(&monthly_expense, q)).collect(),
    };

    // Yearly totals, folded from the monthly series.
    let mut years: Vec<String> = months
        .iter()
        .filter_map(|month| month.split('-').next())
        .map(str::to_string)
        .collect();
    years.sort();
    years.dedup();
    let yearly = TrendSeries {
        income: years
            .iter()
            .map(|year| {
                months
                    .iter()
                    .zip(&monthly_income)
                    .filter(|(month, _)| month.starts_with(year.as_str()))
                    .map(|(_, amount)| amount)
                    .sum()
            })
            .collect(),
        expense: years
            .iter()
            .map(|year| {
                months
                    .iter()
                    .zip(&monthly_expense)
                    .filter(|(month, _)| month.starts_with(year.as_str()))
                    .map(|(_, amount)| amount)
                    .sum()
            })
            .collect(),
        labels: years.iter().map(|year| format!("{year}年")).collect(),
    };

    // Per-member totals, only for the configured household members.
    let mut statement = connection.prepare(&format!(
        "SELECT owner, record_type, COALESCE(SUM(amount), 0)
            FROM ledger_entry WHERE 1=1{clause}
            GROUP BY owner, record_type"
    ))?;
    let owner_rows = statement
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, EntryKind>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut owner_income: HashMap<&str, f64> = HashMap::new();
    let mut owner_expense: HashMap<&str, f64> = HashMap::new();
    for (owner, kind, amount) in &owner_rows {
        if !default_owners.contains(owner) {
            continue;
        }
        match kind {
            EntryKind::Income => owner_income.insert(owner, *amount),
            EntryKind::Expense => owner_expense.insert(owner, *amount),
        };
    }
    let owners = OwnerSeries {
        labels: default_owners.to_vec(),
        income: default_owners
            .iter()
            .map(|owner| owner_income.get(owner.as_str()).copied().unwrap_or(0.0))
            .collect(),
        expense: default_owners
            .iter()
            .map(|owner| owner_expense.get(owner.as_str()).copied().unwrap_or(0.0))
            .collect(),
    };

    let net = monthly_income
        .iter()
        .zip(&monthly_expense)
        .map(|(income, expense)| income - expense)
        .collect();

    Ok(ChartData {
        monthly: TrendSeries {
            labels: months.clone(),
            income: monthly_income.clone(),
            expense: monthly_expense.clone(),
        },
        quarterly,
        yearly,
        category: CategoryPies {
            expense: pie(connection, &clause, &params, EntryKind::Expense, 8)?,
            income: pie(connection, &clause, &params, EntryKind::Income, 5)?,
        },
        comparison: Comparison {
            balance: BalanceSeries {
                labels: months,
                income: monthly_income,
                expense: monthly_expense,
                net,
            },
            owners,
        },
    })
}

/// One line or bar series of a category chart.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Dataset {
    /// The series name, usually a category.
    pub label: String,
    /// One value per chart label.
    pub data: Vec<f64>,
}

/// A chart of per-category amounts, either overall or per period.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct CategoryChart {
    /// The x-axis labels.
    pub labels: Vec<String>,
    /// One series per category.
    pub datasets: Vec<Dataset>,
}

/// The category charts for both entry types.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct CategoryCharts {
    /// The expense chart.
    pub expense: CategoryChart,
    /// The income chart.
    pub income: CategoryChart,
}

fn overall_category_chart(
    connection: &Connection,
    clause: &str,
    params: &[rusqlite::types::Value],
    kind: EntryKind,
) -> Result<CategoryChart, Error> {
    let series = pie(connection, clause, params, kind, 10)?;
    let label = match kind {
        EntryKind::Expense => "支出金额",
        EntryKind::Income => "收入金额",
    };

    if series.labels.is_empty() {
        return Ok(CategoryChart {
            labels: vec!["暂无数据".to_string()],
            datasets: vec![Dataset {
                label: label.to_string(),
                data: vec![0.0],
            }],
        });
    }

    Ok(CategoryChart {
        labels: series.labels,
        datasets: vec![Dataset {
            label: label.to_string(),
            data: series.data,
        }],
    })
}

fn period_label_expression(time_range: &str) -> String {
    match time_range {
        "monthly" => "strftime('%Y', account_date) || '年' \
            || strftime('%m', account_date) || '月'"
            .to_string(),
        "quarterly" => {
            format!("strftime('%Y', account_date) || '年第' || {QUARTER} || '季度'")
        }
        _ => "strftime('%Y', account_date)".to_string(),
    }
}

fn period_category_chart(
    connection: &Connection,
    clause: &str,
    params: &[rusqlite::types::Value],
    kind: EntryKind,
    label_expression: &str,
    periods: &[String],
) -> Result<CategoryChart, Error> {
    let mut statement = connection.prepare(&format!(
        "SELECT {label_expression} AS time_period, category, COALESCE(SUM(amount), 0)
            FROM ledger_entry WHERE record_type = '{}'{clause}
            GROUP BY time_period, category
            ORDER BY time_period, category",
        kind.as_str()
    ))?;
    let rows = statement
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut categories: Vec<String> = rows
        .iter()
        .map(|(_, category, _)| category.clone())
        .filter(|category| !category.is_empty())
        .collect();
    categories.sort();
    categories.dedup();

    let datasets = categories
        .into_iter()
        .map(|category| {
            let mut data = vec![0.0; periods.len()];
            for (period, row_category, amount) in &rows {
                if *row_category == category
                    && let Some(index) = periods.iter().position(|label| label == period)
                {
                    data[index] = *amount;
                }
            }
            Dataset {
                label: category,
                data,
            }
        })
        .collect();

    Ok(CategoryChart {
        labels: periods.to_vec(),
        datasets,
    })
}

/// Build the category charts.
///
/// With `time_range` "all" each chart is the ten largest categories
/// overall; otherwise the chart pivots to one series per category across
/// the monthly, quarterly, or yearly periods in range.
pub fn category_charts(
    connection: &Connection,
    filter: &RangeFilter,
    time_range: &str,
) -> Result<CategoryCharts, Error> {
    let (clause, params) = filter.where_clause();

    if time_range == "all" {
        return Ok(CategoryCharts {
            expense: overall_category_chart(connection, &clause, &params, EntryKind::Expense)?,
            income: overall_category_chart(connection, &clause, &params, EntryKind::Income)?,
        });
    }

    let label_expression = period_label_expression(time_range);
    let mut statement = connection.prepare(&format!(
        "SELECT DISTINCT {label_expression} AS time_period
            FROM ledger_entry WHERE 1=1{clause}
            ORDER BY time_period"
    ))?;
    let periods = statement
        .query_map(rusqlite::params_from_iter(params.iter()), |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;

    if periods.is_empty() {
        return Ok(CategoryCharts::default());
    }

    Ok(CategoryCharts {
        expense: period_category_chart(
            connection,
            &clause,
            &params,
            EntryKind::Expense,
            &label_expression,
            &periods,
        )?,
        income: period_category_chart(
            connection,
            &clause,
            &params,
            EntryKind::Income,
            &label_expression,
            &periods,
        )?,
    })
}
