// ==========================================
// Sell-out 台账系统 - 目录解析器
// ==========================================
// 职责: 预扫描得到的条码集合 → 分块批量查询两张参考表
// 输出: 条码 → 缓存行 / 条码 → 产品 id 两个只读映射
// 补充: 预扫描集合之外的条码走单次运行内的有界缓存
// ==========================================

use crate::domain::catalog::{CatalogMatch, CatalogMiss, PriceCacheEntry};
use crate::repository::catalog_repo::CatalogLookup;
use crate::repository::error::RepositoryResult;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use tracing::debug;

/// 单个条码的解析结果
pub type Resolution = Result<CatalogMatch, CatalogMiss>;

// ==========================================
// ResolvedCatalog - 批量解析后的快照
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ResolvedCatalog {
    entries: HashMap<String, PriceCacheEntry>,
    product_ids: HashMap<String, i64>,
}

impl ResolvedCatalog {
    fn absorb(&mut self, entries: Vec<PriceCacheEntry>, products: Vec<(String, i64)>) {
        for entry in entries {
            self.entries.entry(entry.barcode.clone()).or_insert(entry);
        }
        for (barcode, id) in products {
            self.product_ids.entry(barcode).or_insert(id);
        }
    }

    /// 价格缓存优先判定，其次产品表
    pub fn resolve(&self, code: &str) -> Resolution {
        let entry = self
            .entries
            .get(code)
            .ok_or(CatalogMiss::NotInPriceCache)?;
        let product_id = *self
            .product_ids
            .get(code)
            .ok_or(CatalogMiss::NotInProducts)?;

        Ok(CatalogMatch {
            entry: entry.clone(),
            product_id,
        })
    }

    pub fn price_entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn product_count(&self) -> usize {
        self.product_ids.len()
    }
}

// ==========================================
// BoundedMemo - 有界缓存（先进先出淘汰）
// ==========================================
#[derive(Debug)]
pub struct BoundedMemo {
    capacity: usize,
    values: HashMap<String, Resolution>,
    order: VecDeque<String>,
}

impl BoundedMemo {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            values: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, code: &str) -> Option<&Resolution> {
        self.values.get(code)
    }

    pub fn insert(&mut self, code: String, value: Resolution) {
        if self.values.contains_key(&code) {
            self.values.insert(code, value);
            return;
        }
        while self.values.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.values.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(code.clone());
        self.values.insert(code, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ==========================================
// CatalogResolver - 单次运行的目录解析器
// ==========================================
pub struct CatalogResolver<'a, L: CatalogLookup + ?Sized> {
    lookup: &'a L,
    chunk_size: usize,
    snapshot: ResolvedCatalog,
    prefetched: HashSet<String>,
    memo: BoundedMemo,
}

impl<'a, L: CatalogLookup + ?Sized> CatalogResolver<'a, L> {
    /// # 参数
    /// - lookup: 参考表查询接口
    /// - chunk_size: 每条 IN 查询的条码数
    /// - memo_capacity: 单条码缓存容量
    pub fn new(lookup: &'a L, chunk_size: usize, memo_capacity: usize) -> Self {
        Self {
            lookup,
            chunk_size: chunk_size.max(1),
            snapshot: ResolvedCatalog::default(),
            prefetched: HashSet::new(),
            memo: BoundedMemo::new(memo_capacity),
        }
    }

    /// 批量解析预扫描得到的条码（每块每表一条查询）
    pub fn prefetch(&mut self, codes: &BTreeSet<String>) -> RepositoryResult<()> {
        let pending: Vec<String> = codes
            .iter()
            .filter(|c| !self.prefetched.contains(*c))
            .cloned()
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let mut chunks = 0;
        for chunk in pending.chunks(self.chunk_size) {
            let entries = self.lookup.find_price_entries(chunk)?;
            let products = self.lookup.find_product_ids(chunk)?;
            self.snapshot.absorb(entries, products);
            chunks += 1;
        }
        self.prefetched.extend(pending.iter().cloned());

        debug!(
            codes = pending.len(),
            chunks = chunks,
            price_hits = self.snapshot.price_entry_count(),
            product_hits = self.snapshot.product_count(),
            "目录批量解析完成"
        );
        Ok(())
    }

    /// 解析单个条码
    ///
    /// # 返回
    /// - Ok(Ok(CatalogMatch)): 两张参考表均命中
    /// - Ok(Err(CatalogMiss)): 未命中（附原因）
    /// - Err: 查询失败
    pub fn resolve(&mut self, code: &str) -> RepositoryResult<Resolution> {
        if self.prefetched.contains(code) {
            return Ok(self.snapshot.resolve(code));
        }
        if let Some(hit) = self.memo.get(code) {
            return Ok(hit.clone());
        }

        let key = vec![code.to_string()];
        let mut single = ResolvedCatalog::default();
        single.absorb(
            self.lookup.find_price_entries(&key)?,
            self.lookup.find_product_ids(&key)?,
        );
        let resolution = single.resolve(code);
        self.memo.insert(code.to_string(), resolution.clone());
        Ok(resolution)
    }

    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }
}
