//! The month calendar view of the ledger.

use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::Serialize;
use time::{Date, Month, Weekday};

use crate::{Error, ledger::models::EntryKind};

/// One member's totals for one day.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Default)]
pub struct OwnerDayTotals {
    /// The member's income that day.
    pub income: f64,
    /// The member's expenses that day.
    pub expense: f64,
    /// Income minus expenses.
    pub total: f64,
}

/// The whole-day rollup across members.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Default)]
pub struct DaySummary {
    /// The day's income.
    pub total_income: f64,
    /// The day's expenses.
    pub total_expense: f64,
    /// Income minus expenses.
    pub net_amount: f64,
    /// How many members have entries that day.
    pub owner_count: u64,
}

/// One day of the calendar. Every day of the month gets an entry, with
/// empty member maps for days without activity.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalendarDay {
    /// The date as "YYYY-MM-DD".
    pub date: String,
    /// The day of the month.
    pub day: u8,
    /// The three-letter weekday abbreviation, e.g. "Mon".
    pub weekday: &'static str,
    /// Per-member totals, keyed by member name.
    pub owners: BTreeMap<String, OwnerDayTotals>,
    /// The whole-day rollup.
    pub summary: DaySummary,
}

fn weekday_abbreviation(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Monday => "Mon",
        Weekday::Tuesday => "Tue",
        Weekday::Wednesday => "Wed",
        Weekday::Thursday => "Thu",
        Weekday::Friday => "Fri",
        Weekday::Saturday => "Sat",
        Weekday::Sunday => "Sun",
    }
}

/// Build the calendar for `year`/`month`, optionally narrowed to one
/// member. "全部" and the empty string match every member.
pub fn month_calendar(
    connection: &Connection,
    year: i32,
    month: u8,
    owner: &str,
) -> Result<Vec<CalendarDay>, Error> {
    let month = Month::try_from(month).map_err(|_| Error::InvalidField("月份无效".to_string()))?;

    let start_date = format!("{year}-{:02}-01", month as u8);
    let (next_year, next_month) = match month {
        Month::December => (year + 1, Month::January),
        month => (year, month.next()),
    };
    let end_date = format!("{next_year}-{:02}-01", next_month as u8);

    let mut clause = String::new();
    let mut params: Vec<rusqlite::types::Value> =
        vec![start_date.into(), end_date.into()];
    if !owner.is_empty() && owner != "全部" {
        clause.push_str(" AND owner = ?3");
        params.push(owner.to_string().into());
    }

    let mut statement = connection.prepare(&format!(
        "SELECT account_date, owner, record_type, COALESCE(SUM(amount), 0)
            FROM ledger_entry
            WHERE account_date >= ?1 AND account_date < ?2{clause}
            GROUP BY account_date, owner, record_type
            ORDER BY account_date, owner"
    ))?;
    let rows = statement
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, EntryKind>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let first = Date::from_calendar_date(year, month, 1)
        .map_err(|_| Error::InvalidField("日期无效".to_string()))?;
    let mut weekday = first.weekday();
    let mut days: Vec<CalendarDay> = Vec::new();
    for day in 1..=time::util::days_in_year_month(year, month) {
        days.push(CalendarDay {
            date: format!("{year}-{:02}-{day:02}", month as u8),
            day,
            weekday: weekday_abbreviation(weekday),
            owners: BTreeMap::new(),
            summary: DaySummary::default(),
        });
        weekday = weekday.next();
    }

    for (date, owner, kind, amount) in rows {
        let Some(day) = days.iter_mut().find(|day| day.date == date) else {
            continue;
        };
        let owner = if owner.is_empty() {
            "未知".to_string()
        } else {
            owner
        };

        let totals = day.owners.entry(owner).or_default();
        match kind {
            EntryKind::Income => totals.income = amount,
            EntryKind::Expense => totals.expense = amount,
        }
        totals.total = totals.income - totals.expense;
    }

    for day in &mut days {
        let total_income: f64 = day.owners.values().map(|totals| totals.income).sum();
        let total_expense: f64 = day.owners.values().map(|totals| totals.expense).sum();

        day.summary = DaySummary {
            total_income,
            total_expense,
            net_amount: total_income - total_expense,
            owner_count: day.owners.len() as u64,
        };
    }

    Ok(days)
}

/// Every member that appears on a ledger entry.
pub fn ledger_owners(connection: &Connection) -> Result<Vec<String>, Error> {
    let mut statement = connection
        .prepare("SELECT DISTINCT owner FROM ledger_entry WHERE owner IS NOT NULL AND owner != ''")?;
    let owners = statement
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;

    Ok(owners)
}

#[cfg(test)]
mod calendar_tests {
    use rusqlite::Connection;

    use super::{ledger_owners, month_calendar};
    use crate::{
        db::initialize,
        ledger::{
            db::insert,
            models::{EntryKind, LedgerEntry},
        },
    };

    fn entry(date: &str, kind: EntryKind, amount: f64, owner: &str) -> LedgerEntry {
        LedgerEntry {
            id: None,
            record_type: kind,
            category: "食品酒水".to_string(),
            subcategory: String::new(),
            amount,
            account_date: date.to_string(),
            description: String::new(),
            payment_method: "现金".to_string(),
            owner: owner.to_string(),
        }
    }

    fn seeded_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        for row in [
            entry("2025-05-02", EntryKind::Expense, 35.5, "郭宁"),
            entry("2025-05-02", EntryKind::Income, 100.0, "李佳慧"),
            entry("2025-05-31", EntryKind::Expense, 20.0, "郭宁"),
            entry("2025-06-01", EntryKind::Expense, 99.0, "郭宁"),
        ] {
            insert(&conn, &row).unwrap();
        }

        conn
    }

    #[test]
    fn every_day_of_the_month_is_present() {
        let conn = seeded_db();

        let days = month_calendar(&conn, 2025, 5, "全部").unwrap();

        assert_eq!(days.len(), 31);
        assert_eq!(days[0].date, "2025-05-01");
        assert_eq!(days[0].weekday, "Thu");
        assert!(days[0].owners.is_empty());
        assert_eq!(days[30].date, "2025-05-31");
    }

    #[test]
    fn member_totals_and_day_summary_line_up() {
        let conn = seeded_db();

        let days = month_calendar(&conn, 2025, 5, "全部").unwrap();

        let second = &days[1];
        assert_eq!(second.owners["郭宁"].expense, 35.5);
        assert_eq!(second.owners["郭宁"].total, -35.5);
        assert_eq!(second.owners["李佳慧"].income, 100.0);
        assert_eq!(second.summary.total_income, 100.0);
        assert_eq!(second.summary.total_expense, 35.5);
        assert_eq!(second.summary.net_amount, 64.5);
        assert_eq!(second.summary.owner_count, 2);
    }

    #[test]
    fn adjacent_months_are_excluded() {
        let conn = seeded_db();

        let days = month_calendar(&conn, 2025, 5, "全部").unwrap();

        assert!(days.iter().all(|day| !day.date.starts_with("2025-06")));
        assert_eq!(days[30].summary.total_expense, 20.0);
    }

    #[test]
    fn owner_filter_narrows_the_calendar() {
        let conn = seeded_db();

        let days = month_calendar(&conn, 2025, 5, "李佳慧").unwrap();

        let second = &days[1];
        assert_eq!(second.owners.len(), 1);
        assert_eq!(second.summary.total_expense, 0.0);
    }

    #[test]
    fn invalid_month_is_rejected() {
        let conn = seeded_db();

        assert!(month_calendar(&conn, 2025, 13, "全部").is_err());
    }

    #[test]
    fn ledger_owners_lists_everyone_with_entries() {
        let conn = seeded_db();

        let mut owners = ledger_owners(&conn).unwrap();
        owners.sort();

        assert_eq!(owners, ["李佳慧", "郭宁"]);
    }
}
