use serde::Serialize;

use crate::cli::output::output;
use crate::cli::OutputFormat;
use crate::services::gamification::{level_for_points, level_name, level_progress};

#[derive(Serialize)]
struct LevelInfo {
    points: i32,
    level: usize,
    level_name: &'static str,
    level_progress: i32,
}

pub fn handle(points: i32, output_format: OutputFormat) -> anyhow::Result<()> {
    let level = level_for_points(points);
    let info = LevelInfo {
        points,
        level,
        level_name: level_name(level),
        level_progress: level_progress(points),
    };

    output(output_format, &info, |info| {
        println!(
            "{} points: level {} ({}), {}% towards the next level",
            info.points, info.level, info.level_name, info.level_progress
        );
    })
}
