//! The ledger category taxonomy.
//!
//! Categories are rows of (type, name, subcategory list, position). The
//! subcategory list is stored as a JSON array in a single column since it
//! is only ever read and written whole.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, ledger::models::EntryKind};

/// One category with its subcategories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Whether this is an expense or income category.
    pub category_type: EntryKind,
    /// The category name, e.g. 食品酒水.
    pub category_name: String,
    /// The subcategory names, in display order.
    pub subcategories: Vec<String>,
    /// The category's position within its type.
    pub sort_order: i64,
}

const DEFAULT_EXPENSE_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "食品酒水",
        &["早餐", "午餐", "晚餐", "粮油", "调味品", "水果", "零食", "烟酒"],
    ),
    ("衣服饰品", &["衣服", "裤子", "鞋子", "饰品", "化妆品"]),
    ("居家物业", &["房租", "水电费", "物业费", "维修费", "日用品"]),
    (
        "行车交通",
        &[
            "公交", "地铁", "铁路", "共享单车", "充电桩充电", "出租车", "油费", "停车费",
            "维修保养",
        ],
    ),
    ("交流通讯", &["话费", "网费", "邮费"]),
    ("休闲娱乐", &["电影", "旅游", "游戏", "运动", "聚会"]),
    ("学习进修", &["书籍", "培训", "报名费", "学费"]),
    ("人情往来", &["送礼", "礼品", "请客", "红包"]),
    ("医疗保健", &["药品", "看病", "体检", "保健品"]),
    ("金融保险", &["保险费", "手续费", "利息"]),
    ("其他杂项", &["其他支出"]),
];

const DEFAULT_INCOME_CATEGORIES: &[(&str, &[&str])] = &[
    ("工资收入", &["工资", "奖金", "津贴"]),
    ("投资收益", &["股票", "基金", "理财"]),
    ("其他收入", &["兼职", "礼金", "退款"]),
];

pub(crate) fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account_category (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category_type TEXT NOT NULL,
                category_name TEXT NOT NULL,
                subcategories TEXT NOT NULL,
                sort_order INTEGER NOT NULL
                )",
        (),
    )?;

    Ok(())
}

fn insert_defaults(connection: &Connection) -> Result<(), Error> {
    for (kind, defaults) in [
        (EntryKind::Expense, DEFAULT_EXPENSE_CATEGORIES),
        (EntryKind::Income, DEFAULT_INCOME_CATEGORIES),
    ] {
        for (position, (name, subcategories)) in defaults.iter().enumerate() {
            connection.execute(
                "INSERT INTO account_category
                    (category_type, category_name, subcategories, sort_order)
                    VALUES (?1, ?2, ?3, ?4)",
                (
                    kind,
                    name,
                    serde_json::to_string(subcategories)?,
                    position as i64,
                ),
            )?;
        }
    }

    Ok(())
}

/// Insert the default taxonomy if no categories exist yet.
pub(crate) fn seed_defaults(connection: &Connection) -> Result<(), Error> {
    let count: i64 =
        connection.query_row("SELECT COUNT(*) FROM account_category", [], |row| {
            row.get(0)
        })?;
    if count > 0 {
        return Ok(());
    }

    insert_defaults(connection)?;
    tracing::info!("seeded default ledger categories");

    Ok(())
}

fn map_category(row: &Row) -> Result<(Category, String), rusqlite::Error> {
    Ok((
        Category {
            category_type: row.get(0)?,
            category_name: row.get(1)?,
            subcategories: Vec::new(),
            sort_order: row.get(3)?,
        },
        row.get(2)?,
    ))
}

/// All categories, expenses before income, each in its sort order.
pub fn all(connection: &Connection) -> Result<Vec<Category>, Error> {
    let mut statement = connection.prepare(
        "SELECT category_type, category_name, subcategories, sort_order
            FROM account_category
            ORDER BY category_type, sort_order",
    )?;

    let rows = statement
        .query_map([], map_category)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(mut category, subcategories_json)| {
            category.subcategories = serde_json::from_str(&subcategories_json)?;
            Ok(category)
        })
        .collect()
}

/// Replace the whole taxonomy with `categories`, renumbering them in the
/// order given.
pub fn replace(connection: &Connection, categories: &[Category]) -> Result<(), Error> {
    let transaction = connection.unchecked_transaction()?;

    transaction.execute("DELETE FROM account_category", ())?;
    for (position, category) in categories.iter().enumerate() {
        transaction.execute(
            "INSERT INTO account_category
                (category_type, category_name, subcategories, sort_order)
                VALUES (?1, ?2, ?3, ?4)",
            (
                category.category_type,
                &category.category_name,
                serde_json::to_string(&category.subcategories)?,
                position as i64,
            ),
        )?;
    }

    transaction.commit()?;

    Ok(())
}

/// Throw away the current taxonomy and restore the defaults.
pub fn reset(connection: &Connection) -> Result<(), Error> {
    let transaction = connection.unchecked_transaction()?;

    transaction.execute("DELETE FROM account_category", ())?;
    insert_defaults(&transaction)?;

    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod category_tests {
    use rusqlite::Connection;

    use super::{Category, all, replace, reset};
    use crate::{db::initialize, ledger::models::EntryKind};

    fn init_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn defaults_are_seeded_once() {
        let conn = init_db();

        let categories = all(&conn).unwrap();

        assert_eq!(categories.len(), 14);
        let expense_count = categories
            .iter()
            .filter(|c| c.category_type == EntryKind::Expense)
            .count();
        assert_eq!(expense_count, 11);
        assert_eq!(categories[0].category_name, "食品酒水");
        assert!(categories[0].subcategories.contains(&"早餐".to_string()));
    }

    #[test]
    fn expenses_sort_before_income() {
        let conn = init_db();

        let categories = all(&conn).unwrap();

        let first_income = categories
            .iter()
            .position(|c| c.category_type == EntryKind::Income)
            .unwrap();
        assert!(
            categories[first_income..]
                .iter()
                .all(|c| c.category_type == EntryKind::Income)
        );
    }

    #[test]
    fn replace_renumbers_in_the_given_order() {
        let conn = init_db();
        let custom = vec![
            Category {
                category_type: EntryKind::Expense,
                category_name: "宠物".to_string(),
                subcategories: vec!["猫粮".to_string(), "疫苗".to_string()],
                sort_order: 99,
            },
            Category {
                category_type: EntryKind::Expense,
                category_name: "园艺".to_string(),
                subcategories: vec![],
                sort_order: 42,
            },
        ];

        replace(&conn, &custom).unwrap();

        let categories = all(&conn).unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].category_name, "宠物");
        assert_eq!(categories[0].sort_order, 0);
        assert_eq!(categories[1].sort_order, 1);
    }

    #[test]
    fn reset_restores_the_defaults() {
        let conn = init_db();
        replace(&conn, &[]).unwrap();
        assert!(all(&conn).unwrap().is_empty());

        reset(&conn).unwrap();

        assert_eq!(all(&conn).unwrap().len(), 14);
    }
}
