use crate::common::{Depth, Time};
use alloc::string::String;
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One leg of a dive: travel when the depths differ, a level exposure otherwise.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    pub start_depth: Depth,
    pub end_depth: Depth,
    pub gas: String,
    pub time: Time,
}

impl Segment {
    pub fn flat(depth: Depth, gas: String, time: Time) -> Self {
        Self {
            start_depth: depth,
            end_depth: depth,
            gas,
            time,
        }
    }

    pub fn travel(start_depth: Depth, end_depth: Depth, gas: String, time: Time) -> Self {
        Self {
            start_depth,
            end_depth,
            gas,
            time,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.start_depth == self.end_depth
    }

    fn is_ascending(&self) -> bool {
        self.end_depth < self.start_depth
    }

    fn is_descending(&self) -> bool {
        self.end_depth > self.start_depth
    }
}

/// Non-fatal conditions observed while scheduling.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DecoWarning {
    /// The deco-zone root search failed its bracket: the diver already passed
    /// the leading compartment's zone, so it was clamped to the starting depth.
    StartOfDecoZoneClamped { depth_meters: f64 },
}

/// The merged segment list for the whole dive plus its decompression.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecoSchedule {
    pub segments: Vec<Segment>,
    pub warnings: Vec<DecoWarning>,
}

impl DecoSchedule {
    pub fn runtime(&self) -> Time {
        let mut total = Time::zero();
        for segment in &self.segments {
            total += segment.time;
        }
        total
    }

    /// depth of the first level deco leg after the deepest point, if any
    pub fn first_stop(&self) -> Option<Depth> {
        let deepest = self
            .segments
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.end_depth.partial_cmp(&b.end_depth).unwrap())?
            .0;
        self.segments[deepest + 1..]
            .iter()
            .find(|s| s.is_flat() && s.end_depth > Depth::zero())
            .map(|s| s.end_depth)
    }
}

/// Merge adjacent segments: level legs at one depth on one gas become a single
/// stop, contiguous same-direction travel on one gas becomes a single leg.
pub fn collapse_segments(segments: Vec<Segment>) -> Vec<Segment> {
    let mut collapsed: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        if let Some(last) = collapsed.last_mut() {
            let same_gas = last.gas == segment.gas;
            let flat_pair = last.is_flat() && segment.is_flat() && last.end_depth == segment.start_depth;
            let travel_pair = last.end_depth == segment.start_depth
                && ((last.is_ascending() && segment.is_ascending())
                    || (last.is_descending() && segment.is_descending()));
            if same_gas && (flat_pair || travel_pair) {
                last.end_depth = segment.end_depth;
                last.time += segment.time;
                continue;
            }
        }
        collapsed.push(segment);
    }
    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    fn air() -> String {
        "air".to_string()
    }

    #[test]
    fn test_flat_segments_collapse() {
        let segments = vec![
            Segment::flat(Depth::from_meters(6.), air(), Time::from_minutes(1.)),
            Segment::flat(Depth::from_meters(6.), air(), Time::from_minutes(1.)),
            Segment::flat(Depth::from_meters(6.), air(), Time::from_minutes(1.)),
        ];
        let collapsed = collapse_segments(segments);
        assert_eq!(collapsed.len(), 1);
        assert_eq!(collapsed[0].time, Time::from_minutes(3.));
    }

    #[test]
    fn test_gas_change_keeps_segments_apart() {
        let segments = vec![
            Segment::flat(Depth::from_meters(6.), air(), Time::from_minutes(1.)),
            Segment::flat(Depth::from_meters(6.), "O2".to_string(), Time::from_minutes(1.)),
        ];
        let collapsed = collapse_segments(segments);
        assert_eq!(collapsed.len(), 2);
    }

    #[test]
    fn test_travel_legs_merge_by_direction() {
        let segments = vec![
            Segment::travel(
                Depth::from_meters(12.),
                Depth::from_meters(11.),
                air(),
                Time::from_seconds(6.),
            ),
            Segment::travel(
                Depth::from_meters(11.),
                Depth::from_meters(10.),
                air(),
                Time::from_seconds(6.),
            ),
            Segment::travel(
                Depth::from_meters(10.),
                Depth::from_meters(12.),
                air(),
                Time::from_seconds(12.),
            ),
        ];
        let collapsed = collapse_segments(segments);
        assert_eq!(collapsed.len(), 2);
        assert_eq!(collapsed[0].start_depth, Depth::from_meters(12.));
        assert_eq!(collapsed[0].end_depth, Depth::from_meters(10.));
    }

    #[test]
    fn test_no_adjacent_identical_flats_after_collapse() {
        let segments = vec![
            Segment::flat(Depth::from_meters(9.), air(), Time::from_minutes(2.)),
            Segment::flat(Depth::from_meters(9.), air(), Time::from_minutes(4.)),
            Segment::travel(
                Depth::from_meters(9.),
                Depth::from_meters(6.),
                air(),
                Time::from_seconds(18.),
            ),
            Segment::flat(Depth::from_meters(6.), air(), Time::from_minutes(1.)),
            Segment::flat(Depth::from_meters(6.), air(), Time::from_minutes(1.)),
        ];
        let collapsed = collapse_segments(segments);
        for pair in collapsed.windows(2) {
            let identical_flats = pair[0].is_flat()
                && pair[1].is_flat()
                && pair[0].end_depth == pair[1].end_depth
                && pair[0].gas == pair[1].gas;
            assert!(!identical_flats);
        }
    }
}
