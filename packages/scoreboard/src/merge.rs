//! Away/home line-score pairing.
//!
//! The stats API returns `LineScore` with two rows per game: the away team
//! on even row positions and the home team on the following odd position.
//! [`merge_line_score`] splits the rows by parity and inner-joins the halves
//! on `GAME_SEQUENCE`, producing one `mergedLineScore` row per game with
//! `_away`/`_home` suffixed columns.

use nba_stats_scoreboard_models::{
    Dataset, DateKey, GAME_SEQUENCE_COLUMN, NamedDataset, ScoreboardData, items,
};

use crate::TransformError;

const AWAY_SUFFIX: &str = "_away";
const HOME_SUFFIX: &str = "_home";

/// Whether `date` had no games, judged by its empty `Available` dataset.
///
/// # Errors
///
/// Returns [`TransformError::MissingItem`] if the date has no `Available`
/// dataset.
pub fn is_empty_day(date: DateKey, datasets: &NamedDataset) -> Result<bool, TransformError> {
    datasets
        .get(items::AVAILABLE)
        .map(Dataset::is_empty)
        .ok_or(TransformError::MissingItem {
            date,
            item: items::AVAILABLE,
        })
}

/// Adds a `mergedLineScore` dataset to every date in `data`.
///
/// Dates without games get an empty `mergedLineScore`. Running this more
/// than once replaces the previous result with an identical one.
///
/// # Errors
///
/// Returns [`TransformError`] for the first date whose data is missing
/// `Available`, `LineScore`, or the `GAME_SEQUENCE` column.
pub fn merge_line_score(data: &mut ScoreboardData) -> Result<(), TransformError> {
    for (date, datasets) in data.iter_mut() {
        let merged = if is_empty_day(*date, datasets)? {
            log::debug!("Skipping merging for date: {date}");
            Dataset::empty()
        } else {
            log::debug!("Performing merging for date: {date}");
            let line_score =
                datasets
                    .get(items::LINE_SCORE)
                    .ok_or(TransformError::MissingItem {
                        date: *date,
                        item: items::LINE_SCORE,
                    })?;
            merge_day(*date, line_score)?
        };

        datasets.insert(items::MERGED_LINE_SCORE.to_string(), merged);
    }

    Ok(())
}

/// Joins the even (away) and odd (home) rows of one day's `LineScore`.
///
/// An odd row count leaves the last away row without a home partner; it is
/// dropped by the inner join. Rows with a null `GAME_SEQUENCE` never match.
///
/// # Errors
///
/// Returns [`TransformError::MissingColumn`] if `line_score` has no
/// `GAME_SEQUENCE` column.
pub fn merge_day(date: DateKey, line_score: &Dataset) -> Result<Dataset, TransformError> {
    let key = line_score
        .column_index(GAME_SEQUENCE_COLUMN)
        .ok_or(TransformError::MissingColumn {
            date,
            item: items::LINE_SCORE,
            column: GAME_SEQUENCE_COLUMN,
        })?;

    if line_score.len() % 2 != 0 {
        log::warn!(
            "{date}: LineScore has an odd row count ({}), the unpaired row is dropped",
            line_score.len()
        );
    }

    let away: Vec<&Vec<serde_json::Value>> = line_score.rows().iter().step_by(2).collect();
    let home: Vec<&Vec<serde_json::Value>> =
        line_score.rows().iter().skip(1).step_by(2).collect();

    let columns = joined_columns(line_score.columns(), key);

    let mut rows = Vec::with_capacity(away.len());
    for away_row in away.iter().copied() {
        let seq = &away_row[key];
        if seq.is_null() {
            continue;
        }
        for home_row in home.iter().copied().filter(|h| &h[key] == seq) {
            let mut row = away_row.clone();
            row.extend(
                home_row
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != key)
                    .map(|(_, v)| v.clone()),
            );
            rows.push(row);
        }
    }

    Ok(Dataset::new(columns, rows)?)
}

/// Away columns (join key kept once, unsuffixed) followed by the home
/// non-key columns. Both halves share every column, so all non-key columns
/// collide and get a suffix.
fn joined_columns(columns: &[String], key: usize) -> Vec<String> {
    let away = columns.iter().enumerate().map(|(i, c)| {
        if i == key {
            c.clone()
        } else {
            format!("{c}{AWAY_SUFFIX}")
        }
    });
    let home = columns
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != key)
        .map(|(_, c)| format!("{c}{HOME_SUFFIX}"));

    away.chain(home).collect()
}
