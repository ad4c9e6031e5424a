//! Frame filename conventions.
//!
//! `Indexed` names carry one segment per axis (`<prefix>_sl<N>_ch<N>_p<N>_t<N>.<ext>`).
//! `Linear` names carry the scalar acquisition counter (`<prefix><counter>.<ext>`) and are
//! kept for older datasets.

use std::path::Path;
use acq_index::acq_order::{to_counter, AcquisitionOrder};
use acq_index::coordinate::{AxisSizes, FrameCoordinate};
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub enum FileOrder {
    Indexed,
    Linear,
}

impl Default for FileOrder {
    fn default() -> Self {
        FileOrder::Indexed
    }
}

impl FileOrder {
    pub fn encode(name:&str) -> Option<Self> {
        match name {
            "indexed" => Some(Self::Indexed),
            "linear" => Some(Self::Linear),
            _=> None
        }
    }
    pub fn decode(&self) -> &'static str {
        match self {
            Self::Indexed => "indexed",
            Self::Linear => "linear",
        }
    }
}

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct FrameNaming {
    pub prefix:String,
    pub ext:String,
}

impl Default for FrameNaming {
    fn default() -> Self {
        Self {
            prefix: String::from("img"),
            ext: String::from("raw"),
        }
    }
}

impl FrameNaming {
    pub fn new(prefix:&str,ext:&str) -> Self {
        Self { prefix: prefix.to_string(), ext: ext.to_string() }
    }

    pub fn indexed_name(&self,coord:&FrameCoordinate) -> String {
        format!("{}_sl{}_ch{}_p{}_t{}.{}",self.prefix,coord.slice,coord.channel,coord.position,coord.time,self.ext)
    }

    pub fn linear_name(&self,counter:usize) -> String {
        format!("{}{}.{}",self.prefix,counter,self.ext)
    }

    /// Name of the file holding `coord`. Linear names are counted over the plan's axis sizes;
    /// when the coordinate does not fit the plan the indexed name is used instead.
    pub fn get_filename(&self,file_order:FileOrder,order:AcquisitionOrder,plan_sizes:&AxisSizes,coord:&FrameCoordinate) -> String {
        match file_order {
            FileOrder::Indexed => self.indexed_name(coord),
            FileOrder::Linear => match to_counter(order,plan_sizes,coord) {
                Ok(k) => self.linear_name(k),
                Err(e) => {
                    let fallback = self.indexed_name(coord);
                    warn!("no linear filename for {} ({}); using {}",coord,e,fallback);
                    fallback
                }
            }
        }
    }

    fn indexed_regex(&self) -> Regex {
        let pat = format!(r"^{}_sl(\d+)_ch(\d+)_p(\d+)_t(\d+)\.{}$",regex::escape(&self.prefix),regex::escape(&self.ext));
        Regex::new(&pat).expect("escaped filename pattern is always valid")
    }

    fn linear_regex(&self) -> Regex {
        let pat = format!(r"^{}(\d+)\.{}$",regex::escape(&self.prefix),regex::escape(&self.ext));
        Regex::new(&pat).expect("escaped filename pattern is always valid")
    }

    pub fn parse_indexed(&self,path:&Path) -> Option<FrameCoordinate> {
        let name = path.file_name()?.to_str()?;
        let caps = self.indexed_regex().captures(name)?;
        let n = |i:usize| caps.get(i).and_then(|m| m.as_str().parse::<usize>().ok());
        Some(FrameCoordinate::new(n(1)?,n(2)?,n(3)?,n(4)?))
    }

    pub fn parse_linear(&self,path:&Path) -> Option<usize> {
        let name = path.file_name()?.to_str()?;
        let caps = self.linear_regex().captures(name)?;
        caps.get(1)?.as_str().parse().ok()
    }

    /// detects the convention used by the frame files in `dir`
    pub fn detect(&self,dir:&Path) -> Option<FileOrder> {
        let files = utils::get_all_matches(dir,&format!("{}*.{}",self.prefix,self.ext))?;
        if files.iter().any(|f| self.parse_indexed(f).is_some()) {
            return Some(FileOrder::Indexed)
        }
        if files.iter().any(|f| self.parse_linear(f).is_some()) {
            return Some(FileOrder::Linear)
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn indexed_and_linear_names() {
        let naming = FrameNaming::new("img","raw");
        let sizes = AxisSizes::new(3,2,1,1);
        let c = FrameCoordinate::new(2,2,1,1);
        assert_eq!(naming.get_filename(FileOrder::Indexed,AcquisitionOrder::ZCXYT,&sizes,&c),"img_sl2_ch2_p1_t1.raw");
        assert_eq!(naming.get_filename(FileOrder::Linear,AcquisitionOrder::ZCXYT,&sizes,&c),"img5.raw");
        assert_eq!(naming.get_filename(FileOrder::Linear,AcquisitionOrder::CZXYT,&sizes,&c),"img4.raw");
    }

    #[test]
    fn linear_name_falls_back_when_plan_is_inconsistent() {
        let naming = FrameNaming::default();
        let sizes = AxisSizes::new(1,1,1,1);
        let c = FrameCoordinate::new(1,1,3,1);
        assert_eq!(naming.get_filename(FileOrder::Linear,AcquisitionOrder::ZCXYT,&sizes,&c),"img_sl1_ch1_p3_t1.raw");
    }

    #[test]
    fn parses_names_back() {
        let naming = FrameNaming::new("scan.a","raw");
        let c = FrameCoordinate::new(4,1,12,3);
        let p = PathBuf::from("/data").join(naming.indexed_name(&c));
        assert_eq!(naming.parse_indexed(&p),Some(c));
        assert_eq!(naming.parse_linear(&PathBuf::from("scan.a17.raw")),Some(17));
        // the dot in the prefix is literal
        assert_eq!(naming.parse_linear(&PathBuf::from("scanxa17.raw")),None);
        assert_eq!(FileOrder::encode("linear"),Some(FileOrder::Linear));
    }
}
