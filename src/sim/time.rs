//! Month → day → hour grouping of timestamp labels.
//!
//! Labels look like `YYYY-MM-DD:HHMM`. They are sorted lexicographically and
//! then grouped by consecutive year-month fields, and within each month by
//! consecutive day field, so every window is a contiguous label range.

use anyhow::Result;

use crate::SunlightError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Day {
    pub key: String,
    pub hours: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Month {
    pub key: String,
    pub days: Vec<Day>,
}

impl Month {
    pub fn hours(&self) -> impl Iterator<Item = &str> {
        self.days
            .iter()
            .flat_map(|d| d.hours.iter().map(String::as_str))
    }

    pub fn num_hours(&self) -> usize {
        self.days.iter().map(|d| d.hours.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeHierarchy {
    pub months: Vec<Month>,
}

impl TimeHierarchy {
    pub fn from_labels<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut labels: Vec<String> = labels.into_iter().map(|l| l.as_ref().to_string()).collect();
        labels.sort();
        if let Some(w) = labels.windows(2).find(|w| w[0] == w[1]) {
            return Err(SunlightError::InvalidLabel(format!("duplicate label {}", w[0])).into());
        }

        let mut months: Vec<Month> = Vec::new();
        for label in labels {
            let month = month_key(&label)?;
            let day = day_key(&label)?;

            if months.last().is_none_or(|m| m.key != month) {
                months.push(Month {
                    key: month,
                    days: Vec::new(),
                });
            }
            let Some(current_month) = months.last_mut() else {
                continue;
            };
            if current_month.days.last().is_none_or(|d| d.key != day) {
                current_month.days.push(Day {
                    key: day,
                    hours: Vec::new(),
                });
            }
            if let Some(current_day) = current_month.days.last_mut() {
                current_day.hours.push(label);
            }
        }

        Ok(Self { months })
    }

    /// Every label, in walk order.
    pub fn hours(&self) -> impl Iterator<Item = &str> {
        self.months.iter().flat_map(Month::hours)
    }

    pub fn num_hours(&self) -> usize {
        self.months.iter().map(Month::num_hours).sum()
    }
}

/// Year and month fields of a label (`YYYY-MM` in `YYYY-MM-DD:HHMM`).
pub fn month_key(label: &str) -> Result<String> {
    let mut fields = label.split('-');
    match (fields.next(), fields.next()) {
        (Some(year), Some(month)) if !year.is_empty() && !month.is_empty() => {
            Ok(format!("{year}-{month}"))
        }
        _ => Err(SunlightError::InvalidLabel(label.to_string()).into()),
    }
}

/// Day field of a label (`DD` in `YYYY-MM-DD:HHMM`).
pub fn day_key(label: &str) -> Result<String> {
    label
        .replace(':', "-")
        .split('-')
        .nth(2)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SunlightError::InvalidLabel(label.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() -> Result<()> {
        assert_eq!(month_key("2016-01-02:1300")?, "2016-01");
        assert_eq!(day_key("2016-01-02:1300")?, "02");
        assert!(month_key("20160102").is_err());
        assert!(day_key("2016-01").is_err());
        Ok(())
    }

    #[test]
    fn test_groups_every_month_and_day() -> Result<()> {
        let labels = [
            "2016-02-01:0900",
            "2016-01-01:1000",
            "2016-01-02:0900",
            "2016-01-01:0900",
            "2016-02-01:1000",
        ];
        let hierarchy = TimeHierarchy::from_labels(labels)?;

        assert_eq!(hierarchy.months.len(), 2);
        let jan = &hierarchy.months[0];
        assert_eq!(jan.key, "2016-01");
        assert_eq!(jan.days.len(), 2);
        assert_eq!(jan.days[0].hours, vec!["2016-01-01:0900", "2016-01-01:1000"]);
        assert_eq!(jan.days[1].hours, vec!["2016-01-02:0900"]);
        assert_eq!(jan.num_hours(), 3);

        let feb = &hierarchy.months[1];
        assert_eq!(feb.days.len(), 1);
        assert_eq!(feb.days[0].key, "01");
        assert_eq!(hierarchy.num_hours(), 5);
        assert_eq!(hierarchy.hours().next(), Some("2016-01-01:0900"));
        Ok(())
    }

    #[test]
    fn test_same_month_of_different_years_kept_apart() -> Result<()> {
        let hierarchy = TimeHierarchy::from_labels(["2017-01-05:1200", "2016-01-05:1200"])?;
        let keys: Vec<&str> = hierarchy.months.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, vec!["2016-01", "2017-01"]);
        assert_eq!(hierarchy.months[0].num_hours(), 1);
        Ok(())
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let err = TimeHierarchy::from_labels(["2016-01-01:0900", "2016-01-01:0900"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SunlightError>(),
            Some(SunlightError::InvalidLabel(_))
        ));
    }

    #[test]
    fn test_empty() -> Result<()> {
        let hierarchy = TimeHierarchy::from_labels(Vec::<String>::new())?;
        assert!(hierarchy.months.is_empty());
        Ok(())
    }
}
