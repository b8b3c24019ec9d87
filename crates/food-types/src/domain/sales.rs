use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Orders counted and revenue summed for one local day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailySales {
    pub date: NaiveDate,
    pub total_sales: u64,
    pub total_revenue: Decimal,
}

impl DailySales {
    /// Groups `(created_at, total)` pairs by their day in `offset`, oldest day first.
    pub fn tally(
        sales: impl IntoIterator<Item = (DateTime<Utc>, Decimal)>,
        offset: FixedOffset,
    ) -> Vec<Self> {
        let mut days: BTreeMap<NaiveDate, DailySales> = BTreeMap::new();
        for (created_at, total) in sales {
            let date = created_at.with_timezone(&offset).date_naive();
            let day = days.entry(date).or_insert_with(|| DailySales {
                date,
                total_sales: 0,
                total_revenue: Decimal::ZERO,
            });
            day.total_sales += 1;
            day.total_revenue += total;
        }
        days.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn tally_groups_by_local_day() {
        let sales = vec![
            (at(2, 1), Decimal::new(1000, 2)),
            (at(1, 12), Decimal::new(2550, 2)),
            (at(1, 23), Decimal::new(450, 2)),
        ];

        let utc = DailySales::tally(sales.clone(), FixedOffset::east_opt(0).unwrap());
        assert_eq!(utc.len(), 2);
        assert_eq!(utc[0].date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(utc[0].total_sales, 2);
        assert_eq!(utc[0].total_revenue, Decimal::new(3000, 2));
        assert_eq!(utc[1].total_sales, 1);

        // Three hours behind UTC, 01:00 on the 2nd still belongs to the 1st.
        let behind = DailySales::tally(sales, FixedOffset::west_opt(3 * 3600).unwrap());
        assert_eq!(behind.len(), 1);
        assert_eq!(behind[0].total_sales, 3);
        assert_eq!(behind[0].total_revenue, Decimal::new(4000, 2));
    }

    #[test]
    fn no_sales_means_no_days() {
        assert!(DailySales::tally(Vec::new(), FixedOffset::east_opt(0).unwrap()).is_empty());
    }
}
