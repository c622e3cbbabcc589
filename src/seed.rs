use anyhow::Result;
use chrono::NaiveDate;
use tracing::info;

use crate::models::MemberDraft;
use crate::state::MemberRoster;

fn initial_members() -> Vec<MemberDraft> {
    let birthday = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
    let hiring_date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    vec![
        MemberDraft {
            name: "John Doe".to_string(),
            role: "Senior Frontend Engineer".to_string(),
            birthday,
            hiring_date,
            location: "New York, NY".to_string(),
        },
        MemberDraft {
            name: "Jane Doe".to_string(),
            role: "Senior Backend Engineer".to_string(),
            birthday,
            hiring_date,
            location: "San Francisco, CA".to_string(),
        },
        MemberDraft {
            name: "Jim Doe".to_string(),
            role: "Engineering Manager".to_string(),
            birthday,
            hiring_date,
            location: "Los Angeles, CA".to_string(),
        },
    ]
}

/// Inserts the sample team through the normal create path. Runs every
/// member it can and fails on the first rejection.
pub async fn seed(roster: &mut MemberRoster) -> Result<()> {
    info!("seeding backend with initial members");
    for draft in initial_members() {
        let name = draft.name.clone();
        let created = roster.create(draft).await?;
        info!(id = %created.id, "created member: {name}");
        println!("Created member: {name}");
    }
    println!("Seeding completed.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::state::fakes::FakeMemberStore;

    #[tokio::test]
    async fn seed_inserts_the_three_sample_members() {
        let store = Arc::new(FakeMemberStore::default());
        let mut roster = MemberRoster::new(store);

        seed(&mut roster).await.unwrap();

        let names: Vec<&str> = roster.members().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["John Doe", "Jane Doe", "Jim Doe"]);
        assert_eq!(roster.members()[2].role, "Engineering Manager");
    }
}
