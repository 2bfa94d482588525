use rusqlite::{Connection, Transaction, TransactionBehavior};
use rust_decimal::Decimal;

use crate::db::decimal_at;
use crate::error::EngineResult;
use crate::model::RankEntry;
use crate::registry;

#[derive(Debug, Clone)]
struct Standing {
    summary_id: String,
    enrollment_id: String,
    gpa: Decimal,
    total_marks: Decimal,
}

/// Best first by GPA, then total marks. The sort is stable, so exact ties keep
/// their incoming (roll-number) order and get sequential ranks.
fn order_for_ranking(standings: &mut [Standing]) {
    standings.sort_by(|a, b| {
        b.gpa
            .cmp(&a.gpa)
            .then_with(|| b.total_marks.cmp(&a.total_marks))
    });
}

fn load_group(
    conn: &Connection,
    exam_id: &str,
    standard_id: &str,
    academic_year_id: &str,
) -> EngineResult<Vec<Standing>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.enrollment_id, s.gpa, s.total_marks
         FROM result_summaries s
         JOIN enrollments e ON e.id = s.enrollment_id
         WHERE s.exam_id = ? AND e.standard_id = ? AND e.academic_year_id = ?
         ORDER BY CAST(e.roll_number AS INTEGER), e.roll_number, e.id",
    )?;
    let rows = stmt
        .query_map((exam_id, standard_id, academic_year_id), |r| {
            Ok(Standing {
                summary_id: r.get(0)?,
                enrollment_id: r.get(1)?,
                gpa: decimal_at(r, 2)?,
                total_marks: decimal_at(r, 3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Renumber one group on an open transaction.
pub(crate) fn rank_group(
    conn: &Connection,
    exam_id: &str,
    standard_id: &str,
    academic_year_id: &str,
) -> EngineResult<Vec<RankEntry>> {
    registry::require_exam(conn, exam_id)?;
    registry::require_standard(conn, standard_id)?;
    registry::require_academic_year(conn, academic_year_id)?;

    let mut standings = load_group(conn, exam_id, standard_id, academic_year_id)?;
    order_for_ranking(&mut standings);

    let mut update = conn.prepare("UPDATE result_summaries SET rank = ? WHERE id = ?")?;
    let mut out = Vec::with_capacity(standings.len());
    for (i, s) in standings.into_iter().enumerate() {
        let rank = (i + 1) as i64;
        update.execute((rank, &s.summary_id))?;
        out.push(RankEntry {
            student_enrollment_id: s.enrollment_id,
            rank,
        });
    }
    Ok(out)
}

/// Assign ranks 1..N to every summary of an (exam, standard, academic year) group.
///
/// Runs under `BEGIN IMMEDIATE` so readers never see a half-renumbered group.
pub fn run_ranking(
    conn: &Connection,
    exam_id: &str,
    standard_id: &str,
    academic_year_id: &str,
) -> EngineResult<Vec<RankEntry>> {
    // The caller holds no other transaction on this connection.
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let ranks = rank_group(&tx, exam_id, standard_id, academic_year_id)?;
    tx.commit()?;
    tracing::info!(
        exam = exam_id,
        standard = standard_id,
        ranked = ranks.len(),
        "ranking complete"
    );
    Ok(ranks)
}
