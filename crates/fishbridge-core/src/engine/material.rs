//! Material-only alpha-beta searcher
//!
//! Iterative deepening with a small transposition table, MVV-LVA ordering,
//! check extension and a capture-only quiescence search.

use super::time::StopCheck;
use super::{InfoSink, SearchEngine, SearchJob, SearchOutcome, SearchSignals};
use crate::codec::MoveCodec;
use crate::options::{
    OptionRegistry, CHESS960, CLEAR_HASH, CONTEMPT, HASH, SKILL_LEVEL, THREADS,
};
use crate::position::polyglot_key;
use shakmaty::{CastlingMode, Chess, Color, Move, Position, Role};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Infinity score for search bounds
const INFINITY_SCORE: i32 = 32_000;

/// Score of being mated at the root
const MATE_SCORE: i32 = 31_000;

/// Sentinel returned when the search was interrupted
const SEARCH_INTERRUPTED: i32 = INFINITY_SCORE + 1;

const MAX_PLY: usize = 96;

/// Maximum extra plies in quiescence search
const QUIESCE_MAX_PLY: usize = 8;

type PvLine = SmallVec<[Move; 32]>;

/// Depth searched when a job carries no limit at all
pub const DEFAULT_DEPTH: u32 = 6;

/// Rough footprint of one table entry including map overhead
const TT_ENTRY_BYTES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Exact,
    Lower,
    Upper,
}

#[derive(Debug, Clone)]
struct TtEntry {
    depth: u32,
    score: i32,
    bound: Bound,
    best: Option<Move>,
}

/// Reference engine shipped with the bridge.
#[derive(Debug)]
pub struct MaterialEngine {
    tt: HashMap<u64, TtEntry>,
    tt_capacity: usize,
    clear_presses_seen: u64,
    contempt: i32,
    skill_level: i64,
    /// Last `Threads` value seen; the search itself always runs on one thread
    threads: i64,
    default_depth: u32,
}

impl Default for MaterialEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialEngine {
    pub fn new() -> Self {
        Self {
            tt: HashMap::new(),
            tt_capacity: capacity_for(16),
            clear_presses_seen: 0,
            contempt: 0,
            skill_level: 20,
            threads: 1,
            default_depth: DEFAULT_DEPTH,
        }
    }

    /// Depth for jobs without depth, node, mate, time or infinite limits.
    pub fn with_default_depth(mut self, depth: u32) -> Self {
        self.default_depth = depth.max(1);
        self
    }

    pub fn tt_len(&self) -> usize {
        self.tt.len()
    }
}

fn capacity_for(hash_mb: i64) -> usize {
    let mb = usize::try_from(hash_mb.max(1)).unwrap_or(1);
    mb.saturating_mul(1024 * 1024) / TT_ENTRY_BYTES
}

impl SearchEngine for MaterialEngine {
    fn name(&self) -> &str {
        "material"
    }

    fn configure(&mut self, options: &OptionRegistry) {
        if let Some(mb) = options.spin(HASH) {
            let capacity = capacity_for(mb);
            if capacity != self.tt_capacity {
                log::debug!("Transposition table resized to {capacity} entries");
                self.tt_capacity = capacity;
                self.tt.clear();
            }
        }
        let presses = options.presses(CLEAR_HASH);
        if presses != self.clear_presses_seen {
            self.clear_presses_seen = presses;
            self.tt.clear();
            log::debug!("Transposition table cleared");
        }
        self.contempt = options.spin(CONTEMPT).unwrap_or(0) as i32;
        self.skill_level = options.spin(SKILL_LEVEL).unwrap_or(20);

        let threads = options.spin(THREADS).unwrap_or(1);
        if threads != self.threads {
            self.threads = threads;
            if threads > 1 {
                log::info!("Threads set to {threads}, the material search stays single-threaded");
            }
        }
    }

    fn search(
        &mut self,
        job: &SearchJob,
        signals: &SearchSignals,
        info: InfoSink<'_>,
    ) -> SearchOutcome {
        let mode = if job.options.check(CHESS960).unwrap_or(false) {
            CastlingMode::Chess960
        } else {
            CastlingMode::Standard
        };
        let codec = MoveCodec::new(mode);

        let mut root_moves: Vec<Move> = if job.limits.root_moves.is_empty() {
            job.position.legal_moves().into_iter().collect()
        } else {
            job.limits.root_moves.clone()
        };
        if root_moves.is_empty() {
            return SearchOutcome::default();
        }
        order_moves(&mut root_moves, None);

        let mut max_depth = match job.limits.depth {
            Some(depth) => depth,
            None if job.limits.is_unbounded() => self.default_depth,
            None => MAX_PLY as u32 - 1,
        };
        if let Some(mate) = job.limits.mate {
            max_depth = max_depth.min(mate.saturating_mul(2).saturating_sub(1).max(1));
        }
        if self.skill_level < 20 {
            max_depth = max_depth.min(1 + self.skill_level as u32 / 2);
        }
        let max_depth = max_depth.clamp(1, MAX_PLY as u32 - 1);

        let mut search = Searcher {
            check: StopCheck::new(&job.limits, signals),
            nodes: 0,
            seldepth: 0,
            pv: vec![PvLine::new(); MAX_PLY + QUIESCE_MAX_PLY + 2],
            tt: &mut self.tt,
            tt_capacity: self.tt_capacity,
            path: job.history.clone(),
            contempt: self.contempt,
        };

        let mut best_move = root_moves.first().cloned();
        let mut ponder_move = None;

        for depth in 1..=max_depth {
            if depth > 1 && !search.check.can_start_iteration() {
                break;
            }
            let score = search.root(&job.position, &mut root_moves, depth);
            if score == SEARCH_INTERRUPTED {
                break;
            }

            let pv = search.pv[0].clone();
            if let Some(first) = pv.first() {
                best_move = Some(first.clone());
                ponder_move = pv.get(1).cloned();
            }
            info(format_info(depth, &search, score, &pv, &job.position, &codec));

            if let Some(mate) = job.limits.mate {
                if let Some(n) = mate_in(score) {
                    if n > 0 && n as u32 <= mate {
                        break;
                    }
                }
            }
            // A forced mate will not change with more depth
            if score.abs() >= MATE_SCORE - MAX_PLY as i32 && depth >= 4 {
                break;
            }
        }

        log::debug!(
            "Search {} finished: {} nodes, stopped={}",
            job.search_id,
            search.nodes,
            search.check.was_stopped()
        );
        SearchOutcome {
            best_move,
            ponder_move,
        }
    }
}

struct Searcher<'a> {
    check: StopCheck<'a>,
    nodes: u64,
    seldepth: usize,
    pv: Vec<PvLine>,
    tt: &'a mut HashMap<u64, TtEntry>,
    tt_capacity: usize,
    /// Keys of the positions leading to the current node
    path: Vec<u64>,
    contempt: i32,
}

impl<'a> Searcher<'a> {
    /// Search the root moves, moving the best one to the front.
    fn root(&mut self, pos: &Chess, root_moves: &mut [Move], depth: u32) -> i32 {
        let mut alpha = -INFINITY_SCORE;
        let beta = INFINITY_SCORE;
        let mut best_idx = 0;
        self.pv[0].clear();
        self.path.push(polyglot_key(pos));

        for (idx, mv) in root_moves.iter().enumerate() {
            let mut child = pos.clone();
            child.play_unchecked(mv);
            let score = -self.alpha_beta(&child, depth - 1, -beta, -alpha, 1);
            if score.abs() == SEARCH_INTERRUPTED {
                self.path.pop();
                return SEARCH_INTERRUPTED;
            }
            if score > alpha {
                alpha = score;
                best_idx = idx;
                self.update_pv(0, mv);
            }
        }

        self.path.pop();
        root_moves[..=best_idx].rotate_right(1);
        alpha
    }

    fn update_pv(&mut self, ply: usize, mv: &Move) {
        let (head, tail) = self.pv.split_at_mut(ply + 1);
        let line = &mut head[ply];
        line.clear();
        line.push(mv.clone());
        if let Some(next) = tail.first() {
            line.extend(next.iter().cloned());
        }
    }

    fn draw_score(&self, ply: usize) -> i32 {
        if ply % 2 == 0 {
            -self.contempt
        } else {
            self.contempt
        }
    }

    fn is_repetition(&self, key: u64, halfmoves: u32) -> bool {
        self.path
            .iter()
            .rev()
            .take(halfmoves as usize)
            .any(|&k| k == key)
    }

    fn alpha_beta(&mut self, pos: &Chess, depth: u32, mut alpha: i32, beta: i32, ply: usize) -> i32 {
        if self.check.should_stop(self.nodes) {
            return SEARCH_INTERRUPTED;
        }
        self.nodes += 1;
        self.pv[ply].clear();
        self.seldepth = self.seldepth.max(ply);

        let key = polyglot_key(pos);
        if pos.halfmoves() >= 100
            || pos.is_insufficient_material()
            || self.is_repetition(key, pos.halfmoves())
        {
            return self.draw_score(ply);
        }

        let in_check = pos.is_check();
        let depth = if in_check { depth + 1 } else { depth };
        if depth == 0 || ply >= MAX_PLY - 1 {
            return self.quiesce(pos, alpha, beta, ply);
        }

        let mut moves: Vec<Move> = pos.legal_moves().into_iter().collect();
        if moves.is_empty() {
            return if in_check {
                -MATE_SCORE + ply as i32
            } else {
                self.draw_score(ply)
            };
        }

        let mut tt_move = None;
        if let Some(entry) = self.tt.get(&key) {
            if entry.depth >= depth {
                let score = score_from_tt(entry.score, ply);
                let cutoff = match entry.bound {
                    Bound::Exact => true,
                    Bound::Lower => score >= beta,
                    Bound::Upper => score <= alpha,
                };
                if cutoff {
                    if let Some(best) = entry.best.clone() {
                        self.pv[ply].push(best);
                    }
                    return score;
                }
            }
            tt_move = entry.best.clone();
        }
        order_moves(&mut moves, tt_move.as_ref());

        let original_alpha = alpha;
        let mut best_score = -INFINITY_SCORE;
        let mut best_move = None;
        self.path.push(key);

        for mv in &moves {
            let mut child = pos.clone();
            child.play_unchecked(mv);
            let score = -self.alpha_beta(&child, depth - 1, -beta, -alpha, ply + 1);
            if score.abs() == SEARCH_INTERRUPTED {
                self.path.pop();
                return SEARCH_INTERRUPTED;
            }

            if score > best_score {
                best_score = score;
                best_move = Some(mv.clone());
                if score > alpha {
                    alpha = score;
                    self.update_pv(ply, mv);
                    if score >= beta {
                        break;
                    }
                }
            }
        }
        self.path.pop();

        let bound = if best_score >= beta {
            Bound::Lower
        } else if best_score > original_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        self.store(key, depth, best_score, bound, best_move, ply);
        best_score
    }

    fn quiesce(&mut self, pos: &Chess, mut alpha: i32, beta: i32, ply: usize) -> i32 {
        if self.check.should_stop(self.nodes) {
            return SEARCH_INTERRUPTED;
        }
        self.nodes += 1;
        self.seldepth = self.seldepth.max(ply);

        let stand_pat = evaluate(pos);
        if stand_pat >= beta {
            return stand_pat;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }
        if ply >= self.pv.len() - 2 {
            return stand_pat;
        }

        let mut captures: Vec<Move> = pos
            .legal_moves()
            .into_iter()
            .filter(|m| m.is_capture() || m.is_promotion())
            .collect();
        order_moves(&mut captures, None);

        for mv in &captures {
            let mut child = pos.clone();
            child.play_unchecked(mv);
            let score = -self.quiesce(&child, -beta, -alpha, ply + 1);
            if score.abs() == SEARCH_INTERRUPTED {
                return SEARCH_INTERRUPTED;
            }
            if score > alpha {
                alpha = score;
                if score >= beta {
                    break;
                }
            }
        }
        alpha
    }

    fn store(
        &mut self,
        key: u64,
        depth: u32,
        score: i32,
        bound: Bound,
        best: Option<Move>,
        ply: usize,
    ) {
        if self.tt.len() >= self.tt_capacity && !self.tt.contains_key(&key) {
            self.tt.clear();
        }
        self.tt.insert(
            key,
            TtEntry {
                depth,
                score: score_to_tt(score, ply),
                bound,
                best,
            },
        );
    }
}

fn score_to_tt(score: i32, ply: usize) -> i32 {
    if score >= MATE_SCORE - MAX_PLY as i32 {
        score + ply as i32
    } else if score <= -(MATE_SCORE - MAX_PLY as i32) {
        score - ply as i32
    } else {
        score
    }
}

fn score_from_tt(score: i32, ply: usize) -> i32 {
    if score >= MATE_SCORE - MAX_PLY as i32 {
        score - ply as i32
    } else if score <= -(MATE_SCORE - MAX_PLY as i32) {
        score + ply as i32
    } else {
        score
    }
}

fn piece_value(role: Role) -> i32 {
    match role {
        Role::Pawn => 100,
        Role::Knight => 320,
        Role::Bishop => 330,
        Role::Rook => 500,
        Role::Queen => 900,
        Role::King => 0,
    }
}

fn material(pos: &Chess, color: Color) -> i32 {
    let board = pos.board();
    let ours = board.by_color(color);
    [Role::Pawn, Role::Knight, Role::Bishop, Role::Rook, Role::Queen]
        .into_iter()
        .map(|role| (board.by_role(role) & ours).count() as i32 * piece_value(role))
        .sum()
}

/// Material balance from the side to move's point of view
fn evaluate(pos: &Chess) -> i32 {
    let us = pos.turn();
    material(pos, us) - material(pos, us.other())
}

/// MVV-LVA with the table move first and promotions early.
fn order_moves(moves: &mut [Move], tt_move: Option<&Move>) {
    moves.sort_by_cached_key(|m| {
        let mut key = 0i32;
        if tt_move == Some(m) {
            key -= 1_000_000;
        }
        if let Some(victim) = m.capture() {
            key -= 10 * piece_value(victim) - piece_value(m.role()) / 10;
        }
        if let Some(promo) = m.promotion() {
            key -= piece_value(promo);
        }
        key
    });
}

/// Moves to mate for a mate score, negative when being mated.
fn mate_in(score: i32) -> Option<i32> {
    if score.abs() < MATE_SCORE - MAX_PLY as i32 {
        return None;
    }
    let plies = MATE_SCORE - score.abs();
    let moves = (plies + 1) / 2;
    Some(if score > 0 { moves } else { -moves })
}

fn format_info(
    depth: u32,
    search: &Searcher<'_>,
    score: i32,
    pv: &[Move],
    root: &Chess,
    codec: &MoveCodec,
) -> String {
    let elapsed = search.check.elapsed();
    let millis = elapsed.as_millis().max(1) as u64;
    let nps = search.nodes.saturating_mul(1000) / millis;
    let score = match mate_in(score) {
        Some(n) => format!("mate {n}"),
        None => format!("cp {score}"),
    };

    let mut line = format!(
        "info depth {depth} seldepth {} score {score} nodes {} nps {nps} time {} pv",
        search.seldepth.max(depth as usize),
        search.nodes,
        elapsed.as_millis()
    );
    // Table cutoffs can leave moves in the line that are no longer legal
    let mut pos = root.clone();
    for mv in pv {
        if !pos.is_legal(mv) {
            break;
        }
        line.push(' ');
        line.push_str(&codec.to_coordinate(mv));
        pos.play_unchecked(mv);
    }
    line
}
