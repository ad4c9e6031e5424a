use acq_index::acq_order::{to_coordinate, to_counter, AcquisitionOrder};
use acq_index::coordinate::{AxisSizes, FrameCoordinate};
use std::collections::HashSet;

fn all_sizes(max:usize) -> Vec<AxisSizes> {
    let mut v = vec![];
    for s in 1..=max {
        for c in 1..=max {
            for p in 1..=max {
                for t in 1..=max {
                    v.push(AxisSizes::new(s,c,p,t));
                }
            }
        }
    }
    v
}

#[test]
fn counter_round_trips_for_every_order_and_size() {
    for order in AcquisitionOrder::ALL {
        for sizes in all_sizes(5) {
            for k in 1..=sizes.n_frames() {
                let c = to_coordinate(order,&sizes,k).unwrap();
                assert_eq!(to_counter(order,&sizes,&c).unwrap(),k,"order {} sizes {}",order,sizes);
            }
        }
    }
}

#[test]
fn coordinate_round_trips_and_covers_the_grid() {
    let sizes = AxisSizes::new(3,2,4,2);
    for order in AcquisitionOrder::ALL {
        let mut seen = HashSet::new();
        for s in 1..=3 {
            for c in 1..=2 {
                for p in 1..=4 {
                    for t in 1..=2 {
                        let coord = FrameCoordinate::new(s,c,p,t);
                        let k = to_counter(order,&sizes,&coord).unwrap();
                        assert!(seen.insert(k));
                        assert_eq!(to_coordinate(order,&sizes,k).unwrap(),coord);
                    }
                }
            }
        }
        assert_eq!(seen.len(),sizes.n_frames());
    }
}

#[test]
fn index_algebra_is_shareable_across_threads() {
    let sizes = AxisSizes::new(2,3,2,2);
    let handles:Vec<_> = AcquisitionOrder::ALL.iter().map(|order|{
        let order = *order;
        std::thread::spawn(move ||{
            (1..=sizes.n_frames()).all(|k| to_counter(order,&sizes,&to_coordinate(order,&sizes,k).unwrap()).unwrap() == k)
        })
    }).collect();
    for h in handles {
        assert!(h.join().unwrap());
    }
}
