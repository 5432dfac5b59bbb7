//! One-axis box layout.
//!
//! Children are laid out end to end along the main axis, separated by a
//! fixed gap and framed by a fixed margin. The sizes come from a
//! [`SeriesSpring`] of the children's main-axis springs; a trailing slack
//! spring takes whatever the children cannot absorb once they are all at
//! their maximum. On the cross axis each child is stretched to the
//! container, within its own cross-axis bounds.

use super::spring::{SeriesSpring, TensionSpring, MAX_SIZE, MAX_TENSION, PREF_TENSION};
use crate::error::Result;
use crate::geometry::{Axis, Region};

/// Sizing of one child.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxChild {
    main: TensionSpring,
    cross_min: f64,
    cross_max: f64,
}

impl BoxChild {
    pub fn new(main: TensionSpring, cross_min: f64, cross_max: f64) -> Self {
        let cross_min = cross_min.max(0.0);
        Self {
            main,
            cross_min,
            cross_max: cross_max.max(cross_min),
        }
    }

    /// A child from raw attribute values. `pref` is clamped into
    /// `[min, max]` and a `max` below `min` is raised to it.
    pub fn from_bounds(min: f64, pref: f64, max: f64, cross_min: f64, cross_max: f64) -> Result<Self> {
        let min = min.clamp(0.0, MAX_SIZE);
        let max = max.clamp(min, MAX_SIZE);
        let main = TensionSpring::build(min, max, pref.clamp(min, max)).build()?;
        Ok(Self::new(main, cross_min, cross_max))
    }

    pub fn main(&self) -> &TensionSpring {
        &self.main
    }

    fn cross_size(&self, available: f64) -> f64 {
        available.clamp(self.cross_min, self.cross_max)
    }
}

/// Regions produced by [`BoxLayout::layout`].
#[derive(Debug, Clone, PartialEq)]
pub struct BoxLayoutResult {
    origin: Region,
    regions: Vec<Region>,
    overflow: f64,
}

impl BoxLayoutResult {
    /// The region of child `index`. Unknown children get a zero-sized
    /// region at the container origin.
    pub fn region(&self, index: usize) -> Region {
        self.regions
            .get(index)
            .copied()
            .unwrap_or(Region::new(self.origin.x, self.origin.y, 0, 0))
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Main-axis length missing to fit every child at its minimum.
    pub fn overflow(&self) -> f64 {
        self.overflow
    }
}

/// Children stacked along one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxLayout {
    axis: Axis,
    gap: f64,
    margin: f64,
    children: Vec<BoxChild>,
}

impl BoxLayout {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            gap: 0.0,
            margin: 0.0,
            children: Vec::new(),
        }
    }

    /// Set the space between adjacent children (builder).
    pub fn with_gap(mut self, gap: f64) -> Self {
        self.gap = gap.max(0.0);
        self
    }

    /// Set the space before the first and after the last child (builder).
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin.max(0.0);
        self
    }

    /// Add a child (builder).
    pub fn with_child(mut self, child: BoxChild) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: BoxChild) {
        self.children.push(child);
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// The main-axis spring of the whole box, margins and gaps included.
    /// An empty box is fixed at zero.
    pub fn main_spring(&self) -> Result<TensionSpring> {
        if self.children.is_empty() {
            return TensionSpring::fixed(0.0);
        }
        Ok(SeriesSpring::new(self.components(false)?)?.spring().clone())
    }

    /// Lay the children out inside `region`.
    pub fn layout(&self, region: Region) -> Result<BoxLayoutResult> {
        if self.children.is_empty() {
            return Ok(BoxLayoutResult {
                origin: region,
                regions: Vec::new(),
                overflow: 0.0,
            });
        }
        let available = f64::from(region.size().along(self.axis).max(0));
        let cross = f64::from(region.size().along(self.axis.cross()).max(0));

        let series = SeriesSpring::new(self.components(true)?)?;
        let min = series.spring().min();
        let overflow = (min - available).max(0.0);
        let sizes = series.distribute(available.max(min));

        // Components alternate margin, child, gap, child, ..., margin, slack.
        let mut cursor = 0.0;
        let mut regions = Vec::with_capacity(self.children.len());
        for (index, size) in sizes.iter().enumerate() {
            let start = cursor;
            cursor += size;
            if index % 2 == 0 {
                continue;
            }
            let Some(child) = self.children.get(index / 2) else {
                break;
            };
            let (start, end) = (start.round(), cursor.round());
            regions.push(Region::from_axis(
                region,
                self.axis,
                start as f32,
                (end - start) as f32,
                0.0,
                child.cross_size(cross) as f32,
            ));
        }

        Ok(BoxLayoutResult {
            origin: region,
            regions,
            overflow,
        })
    }

    fn components(&self, with_slack: bool) -> Result<Vec<TensionSpring>> {
        let margin = TensionSpring::fixed(self.margin)?;
        let gap = TensionSpring::fixed(self.gap)?;
        let mut components = vec![margin.clone()];
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                components.push(gap.clone());
            }
            components.push(child.main.clone());
        }
        components.push(margin);
        if with_slack {
            components.push(slack()?);
        }
        Ok(components)
    }
}

/// Zero-sized until every child is stretched to its soft maximum.
fn slack() -> Result<TensionSpring> {
    TensionSpring::build(0.0, MAX_SIZE, 0.0)
        .with(0.0, -PREF_TENSION, MAX_TENSION)?
        .with(MAX_SIZE, -MAX_TENSION, -PREF_TENSION)?
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn child(min: f64, pref: f64, max: f64) -> BoxChild {
        BoxChild::from_bounds(min, pref, max, 0.0, MAX_SIZE).unwrap()
    }

    #[test]
    fn children_share_space_around_a_gap() {
        let layout = BoxLayout::new(Axis::Horizontal)
            .with_gap(10.0)
            .with_child(child(0.0, 20.0, 100.0))
            .with_child(child(0.0, 20.0, 100.0));
        let result = layout.layout(Region::new(0, 0, 100, 20)).unwrap();
        assert_eq!(
            result.regions(),
            &[Region::new(0, 0, 45, 20), Region::new(55, 0, 45, 20)]
        );
        assert_eq!(result.overflow(), 0.0);
    }

    #[test]
    fn slack_collects_space_beyond_maximums() {
        let layout = BoxLayout::new(Axis::Horizontal)
            .with_margin(2.0)
            .with_child(child(0.0, 5.0, 10.0))
            .with_child(child(0.0, 5.0, 20.0));
        let result = layout.layout(Region::new(10, 0, 200, 4)).unwrap();
        assert_eq!(result.region(0), Region::new(12, 0, 10, 4));
        assert_eq!(result.region(1), Region::new(22, 0, 20, 4));
    }

    #[test]
    fn vertical_boxes_swap_axes_and_clamp_cross_size() {
        let narrow = BoxChild::from_bounds(10.0, 10.0, 10.0, 0.0, 8.0).unwrap();
        let wide = BoxChild::from_bounds(10.0, 10.0, 10.0, 30.0, 50.0).unwrap();
        let layout = BoxLayout::new(Axis::Vertical).with_child(narrow).with_child(wide);
        let result = layout.layout(Region::new(0, 0, 20, 100)).unwrap();
        assert_eq!(result.region(0), Region::new(0, 0, 8, 10));
        assert_eq!(result.region(1), Region::new(0, 10, 30, 10));
    }

    #[test]
    fn too_little_space_keeps_minimums_and_reports_overflow() {
        let layout = BoxLayout::new(Axis::Horizontal)
            .with_gap(10.0)
            .with_child(child(60.0, 70.0, 80.0))
            .with_child(child(60.0, 70.0, 80.0));
        let result = layout.layout(Region::new(0, 0, 100, 5)).unwrap();
        assert_eq!(result.region(0), Region::new(0, 0, 60, 5));
        assert_eq!(result.region(1), Region::new(70, 0, 60, 5));
        assert_eq!(result.overflow(), 30.0);
    }

    #[test]
    fn empty_box_is_zero_sized_everywhere() {
        let layout = BoxLayout::new(Axis::Horizontal).with_gap(4.0);
        let spring = layout.main_spring().unwrap();
        assert_eq!((spring.min(), spring.pref(), spring.max()), (0.0, 0.0, 0.0));
        let result = layout.layout(Region::new(3, 4, 50, 50)).unwrap();
        assert!(result.regions().is_empty());
        assert_eq!(result.region(0), Region::new(3, 4, 0, 0));
        assert_eq!(result.region(7), Region::new(3, 4, 0, 0));
    }

    #[test]
    fn main_spring_adds_gaps_and_margins() {
        let layout = BoxLayout::new(Axis::Horizontal)
            .with_gap(3.0)
            .with_margin(1.0)
            .with_child(child(5.0, 10.0, 20.0))
            .with_child(child(5.0, 10.0, 20.0));
        let spring = layout.main_spring().unwrap();
        assert_eq!(spring.min(), 15.0);
        assert_eq!(spring.pref(), 25.0);
        assert_eq!(spring.max(), 45.0);
    }

    #[test]
    fn layout_is_repeatable() {
        let layout = BoxLayout::new(Axis::Horizontal)
            .with_gap(1.5)
            .with_child(child(1.0, 7.0, 33.0))
            .with_child(child(0.0, 3.0, 9.0))
            .with_child(child(2.0, 2.0, 50.0));
        let region = Region::new(0, 0, 61, 9);
        assert_eq!(layout.layout(region).unwrap(), layout.layout(region).unwrap());
    }
}
