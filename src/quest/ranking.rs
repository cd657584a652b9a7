use serde::{Deserialize, Serialize};

fn anonymous() -> String {
    "Anonymous".into()
}

/// Points collected by one user over all quests and rooms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub uid: String,
    #[serde(default = "anonymous")]
    pub name: String,
    #[serde(default)]
    pub points: i64,
}

/// Orders users from the most points down. Users with equal points keep their input order.
pub fn rank(mut users: Vec<RankingEntry>) -> Vec<RankingEntry> {
    users.sort_by(|a, b| b.points.cmp(&a.points));
    users
}

#[cfg(test)]
mod tests {
    use super::{rank, RankingEntry};

    fn entry(uid: &str, points: i64) -> RankingEntry {
        RankingEntry {
            uid: uid.into(),
            name: uid.to_uppercase(),
            points,
        }
    }

    #[test]
    fn test_rank_by_points() {
        let ranked = rank(vec![
            entry("a", 10),
            entry("b", 80),
            entry("c", 10),
            entry("d", 0),
        ]);
        let uids = ranked.iter().map(|v| v.uid.as_str()).collect::<Vec<_>>();
        assert_eq!(uids, vec!["b", "a", "c", "d"]);
        assert!(rank(vec![]).is_empty());
    }

    #[test]
    fn test_missing_fields_get_defaults() -> anyhow::Result<()> {
        let users = serde_json::from_str::<Vec<RankingEntry>>(r#"[{"uid":"x"}]"#)?;
        assert_eq!(users[0].name, "Anonymous");
        assert_eq!(users[0].points, 0);
        Ok(())
    }
}
