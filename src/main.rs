// src/main.rs
//
// Demo walk-through of the repository layer against a local store.
// Usage: datarepo [config.json]

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use datarepo::db::{create_connection_pool, get_database_stats, initialize_database};
use datarepo::{
    CrudRepository, Direction, Member, MemberRepository, PageRequest, Session, Sort, SqliteMemberRepository,
    SqliteTeamRepository, StoreConfig, Team, TeamRepository,
};

fn main() -> anyhow::Result<()> {
    // 1. LOGGING (log records are bridged into the fmt subscriber)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 2. CONFIGURATION
    let config = match std::env::args().nth(1) {
        Some(path) => StoreConfig::from_json_file(Path::new(&path))
            .with_context(|| format!("failed to load config from {}", path))?,
        None => StoreConfig::default(),
    }
    .with_env_overrides()?;

    // 3. INFRASTRUCTURE
    let pool = Arc::new(create_connection_pool(&config)?);
    {
        let conn = pool.get()?;
        initialize_database(&conn)?;
    }

    // 4. REPOSITORIES (every declaration is verified here)
    let members = SqliteMemberRepository::new(&pool).context("member repository declarations")?;
    let teams = SqliteTeamRepository::new(&pool).context("team repository declarations")?;

    // 5. ONE UNIT OF WORK
    let mut session = Session::begin(&pool)?;

    let team_a = match teams.find_by_name(&mut session, "teamA")?.pop() {
        Some(team) => team,
        None => teams.save(&mut session, Team::new("teamA"))?,
    };
    for (name, age) in [("member1", 10), ("member2", 19), ("member3", 20), ("member4", 21), ("member5", 40)] {
        if members.find_list_by_username(&mut session, name)?.is_empty() {
            members.save(&mut session, Member::with_team(name, age, &team_a))?;
        }
    }

    let request = PageRequest::sorted(0, 3, Sort::by(Direction::Desc, &["username"]));
    let page = members.find_by_age(&mut session, 10, &request)?;
    println!("{}", serde_json::to_string_pretty(&page)?);

    let affected = members.bulk_age_plus(&mut session, 20)?;
    println!("bulk update touched {} member(s)", affected);

    for dto in members.find_member_dto(&mut session)? {
        println!("{}", serde_json::to_string(&dto)?);
    }

    session.commit()?;

    let stats = get_database_stats(&*pool.get()?)?;
    println!(
        "members={} teams={} size_bytes={}",
        stats.member_count, stats.team_count, stats.size_bytes
    );

    Ok(())
}
