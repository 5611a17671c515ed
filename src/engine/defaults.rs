//! Local starter content for the setup screen.
//!
//! Everything here is pure: callers pass the random source, so a seeded
//! generator reproduces the same picks.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::model::scenario::ScenarioParams;

pub const STARTUP_TYPES: [&str; 15] = [
    "AI教育平台",
    "智能咖啡馆",
    "无人便利店",
    "宠物医疗科技",
    "智慧农业科技",
    "元宇宙社交",
    "数字艺术平台",
    "智能家居系统",
    "健康科技服务",
    "可持续能源",
    "智能物流配送",
    "在线心理咨询",
    "数字文创平台",
    "智能养老服务",
    "新能源出行",
];

pub const LOCATIONS: [&str; 10] = [
    "北京朝阳区望京SOHO",
    "北京海淀区中关村",
    "上海浦东新区张江高科技园区",
    "深圳南山区科技园",
    "杭州西湖区黄龙万科中心",
    "广州天河区珠江新城",
    "成都高新区天府软件园",
    "武汉东湖新技术开发区",
    "西安高新区软件新城",
    "苏州工业园区独墅湖科教创新区",
];

pub const TEAM_BACKGROUNDS: [&str; 10] = [
    "创始人是前谷歌工程师，联合创始人有10年产品经验",
    "创始团队来自清华计算机系，有3个AI算法专家",
    "创始人有5年咖啡连锁经验，技术合伙人是AI工程师",
    "创始人是连续创业者，核心团队来自头部互联网公司",
    "创始人是医学博士，联合创始人是资深开发工程师",
    "创始团队由3位海归组成，均有创业经验",
    "创始人是资深设计师，技术团队来自BAT",
    "创始人是行业专家，团队包含3位全栈工程师",
    "创始团队由产品、技术、运营三位合伙人组成",
    "创始人有丰富投资经验，技术团队来自知名创业公司",
];

pub const COMPANY_NAME_PREFIXES: [&str; 10] = [
    "未来", "智慧", "创新", "数字", "云端", "智能", "星辰", "光年", "量子", "极光",
];

pub const COMPANY_NAME_SUFFIXES: [&str; 6] = ["科技", "智能", "未来", "创新", "云计算", "数字"];

fn pick<R: Rng + ?Sized>(rng: &mut R, pool: &[&str]) -> String {
    pool.choose(rng).copied().unwrap_or_default().to_string()
}

pub fn company_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let prefix = pick(rng, &COMPANY_NAME_PREFIXES);
    let suffix = pick(rng, &COMPANY_NAME_SUFFIXES);
    prefix + &suffix
}

/// One random pick from each pool.
pub fn produce_defaults<R: Rng + ?Sized>(rng: &mut R) -> ScenarioParams {
    ScenarioParams {
        company_name: company_name(rng),
        startup_type: pick(rng, &STARTUP_TYPES),
        location: pick(rng, &LOCATIONS),
        team_info: pick(rng, &TEAM_BACKGROUNDS),
    }
}

/// Up to `count` distinct startup types, sampled without replacement.
/// Asking for more than the pool holds yields the whole pool once.
pub fn produce_suggestions<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<String> {
    STARTUP_TYPES
        .choose_multiple(rng, count)
        .map(|t| t.to_string())
        .collect()
}
