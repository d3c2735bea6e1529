//! Replays the JSON fixture in `tests/data/` against the tree: per-offset
//! query expectations first, then a sequence of edits.

use std::fs::File;
use std::io::BufReader;

use serde::Deserialize;

use offset_tree::Timespan;
use offset_tree::TimespanTree;

type Span = Timespan<i64>;

#[derive(Debug, Clone, Deserialize)]
struct Probe {
    offset: i64,
    starting: Vec<(i64, i64)>,
    stopping: Vec<(i64, i64)>,
    overlapping: Vec<(i64, i64)>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum Edit {
    Insert { span: (i64, i64) },
    Remove { span: (i64, i64), found: bool },
    Split { at: i64, cut: usize },
}

#[derive(Debug, Clone, Deserialize)]
struct Fixture {
    spans: Vec<(i64, i64)>,
    probes: Vec<Probe>,
    edits: Vec<Edit>,
    after_edits: Vec<(i64, i64)>,
}

impl Fixture {
    fn load(filename: &str) -> Fixture {
        let path = format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), filename);
        let file = File::open(&path).expect("failed to open fixture");
        return serde_json::from_reader(BufReader::new(file)).expect("failed to parse JSON");
    }

    fn tree(&self) -> TimespanTree<Span> {
        return self.spans.iter().map(|&(s, e)| span((s, e))).collect();
    }
}

fn span((start, end): (i64, i64)) -> Span {
    return Timespan::bare(start, end).expect("fixture span is well formed");
}

fn sorted_bounds<'a>(items: impl IntoIterator<Item = &'a Span>) -> Vec<(i64, i64)> {
    let mut out: Vec<(i64, i64)> = items.into_iter().map(|x| x.bounds()).collect();
    out.sort();
    return out;
}

#[test]
fn probes_match_fixture() {
    let fixture = Fixture::load("scenario.json");
    let tree = fixture.tree();
    assert_eq!(tree.len(), fixture.spans.len());

    for probe in &fixture.probes {
        let p = probe.offset;
        let starting: Vec<_> = tree.elements_starting_at(p).iter().map(|x| x.bounds()).collect();
        assert_eq!(starting, probe.starting, "starting at {p}");

        let stopping: Vec<_> = tree.elements_stopping_at(p).iter().map(|x| x.bounds()).collect();
        assert_eq!(stopping, probe.stopping, "stopping at {p}");

        assert_eq!(
            sorted_bounds(tree.elements_overlapping(p)),
            probe.overlapping,
            "overlapping {p}"
        );
    }
}

#[test]
fn verticalities_agree_with_probes() {
    let fixture = Fixture::load("scenario.json");
    let tree = fixture.tree();

    for probe in &fixture.probes {
        let v = tree.verticality_at(probe.offset);
        assert_eq!(v.start_timespans().len(), probe.starting.len());
        assert_eq!(v.stop_timespans().len(), probe.stopping.len());
        assert_eq!(v.overlap_timespans().len(), probe.overlapping.len());
        assert_eq!(v.degree_of_overlap(), probe.starting.len() + probe.overlapping.len());
    }
}

#[test]
fn edits_replay_to_expected_listing() {
    let fixture = Fixture::load("scenario.json");
    let mut tree = fixture.tree();

    for edit in &fixture.edits {
        match edit {
            Edit::Insert { span: bounds } => tree.insert(span(*bounds)),
            Edit::Remove { span: bounds, found } => {
                assert_eq!(tree.remove(&span(*bounds)).is_some(), *found, "remove {bounds:?}");
            }
            Edit::Split { at, cut } => assert_eq!(tree.split_at(*at), *cut, "split at {at}"),
        }
        assert!(tree.validate().is_ok());
    }

    let listing: Vec<_> = tree.iter().map(|x| x.bounds()).collect();
    assert_eq!(listing, fixture.after_edits);
}
