use crate::front::ast::{Expr, InitVal};

/// 各维长度之积；空切片积为 1
pub fn product(dims: &[usize]) -> usize {
    dims.iter().product()
}

/// 把嵌套初始化列表按花括号对齐规则摊平为线性元素表
///
/// 返回长度为 ∏dims 的向量（标量定义为 1），None 表示零填充。
/// 对齐规则：嵌套花括号列表先把写入位置上对齐到当前维步长的整数倍，
/// 再按下一维展开；花括号后面的标量从对齐展开结束的位置继续。
pub fn flatten_init<'a>(init: Option<&'a InitVal>, dims: &[usize]) -> Vec<Option<&'a Expr>> {
    let total = if dims.is_empty() { 1 } else { product(dims) };
    let mut out = vec![None; total];
    if let Some(init) = init {
        let mut pos = 0;
        fill(init, dims, 0, &mut pos, &mut out);
    }
    out
}

fn fill<'a>(
    init: &'a InitVal,
    dims: &[usize],
    dim_idx: usize,
    pos: &mut usize,
    out: &mut [Option<&'a Expr>],
) {
    // 已越过最内维：剩余内容视为平铺序列
    if dim_idx >= dims.len() {
        match init {
            InitVal::Single(expr) => {
                if *pos < out.len() {
                    out[*pos] = Some(expr);
                }
                *pos += 1;
            }
            InitVal::List(list) => {
                for child in list {
                    fill(child, dims, dim_idx, pos, out);
                }
            }
        }
        return;
    }
    match init {
        InitVal::Single(expr) => {
            if *pos < out.len() {
                out[*pos] = Some(expr);
            }
            *pos += 1;
        }
        InitVal::List(list) => {
            let sub = product(&dims[dim_idx + 1..]);
            for child in list {
                if matches!(child, InitVal::List(_)) && sub > 0 {
                    // 花括号对齐：上取整到子数组步长的整数倍
                    *pos = (*pos + sub - 1) / sub * sub;
                }
                fill(child, dims, dim_idx + 1, pos, out);
            }
        }
    }
}

/// 线性下标换算为按维下标（行优先）
pub fn linear_to_indices(mut idx: usize, dims: &[usize]) -> Vec<usize> {
    let mut indices = Vec::with_capacity(dims.len());
    for i in 0..dims.len() {
        let stride = product(&dims[i + 1..]);
        let div = if stride == 0 { 1 } else { stride };
        indices.push(idx / div);
        idx %= div;
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::ast::Span;

    fn int(n: i32) -> InitVal {
        InitVal::Single(Expr::IntLiteral(n, Span::default()))
    }

    fn list(elems: Vec<InitVal>) -> InitVal {
        InitVal::List(elems)
    }

    fn values(flat: &[Option<&Expr>]) -> Vec<i32> {
        flat.iter()
            .map(|e| match e {
                Some(Expr::IntLiteral(n, _)) => *n,
                Some(_) => panic!("expected integer literal"),
                None => 0,
            })
            .collect()
    }

    #[test]
    fn test_scalar_init() {
        let init = int(7);
        let flat = flatten_init(Some(&init), &[]);
        assert_eq!(values(&flat), vec![7]);
        assert_eq!(flatten_init(None, &[]).len(), 1);
    }

    #[test]
    fn test_fully_braced() {
        // int a[2][3] = {{1,2,3},{4,5,6}}
        let init = list(vec![
            list(vec![int(1), int(2), int(3)]),
            list(vec![int(4), int(5), int(6)]),
        ]);
        let flat = flatten_init(Some(&init), &[2, 3]);
        assert_eq!(values(&flat), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_partial_rows_zero_fill() {
        // int a[2][3] = {{1},{2}}
        let init = list(vec![list(vec![int(1)]), list(vec![int(2)])]);
        let flat = flatten_init(Some(&init), &[2, 3]);
        assert_eq!(values(&flat), vec![1, 0, 0, 2, 0, 0]);
    }

    #[test]
    fn test_flat_list() {
        // int a[2][3] = {1,2,3,4}
        let init = list(vec![int(1), int(2), int(3), int(4)]);
        let flat = flatten_init(Some(&init), &[2, 3]);
        assert_eq!(values(&flat), vec![1, 2, 3, 4, 0, 0]);
    }

    #[test]
    fn test_brace_alignment_mixed() {
        // int a[2][3] = {1,2,{3},4,5}
        // {3} 先对齐到下一行行首（位置 3），其后的标量从位置 4 继续
        let init = list(vec![int(1), int(2), list(vec![int(3)]), int(4), int(5)]);
        let flat = flatten_init(Some(&init), &[2, 3]);
        assert_eq!(values(&flat), vec![1, 2, 0, 3, 4, 5]);
    }

    #[test]
    fn test_brace_alignment_three_dims() {
        // int a[2][2][2] = {1,{2},3}
        // {2} 对齐到第一个 2x2 子块之后（位置 4）
        let init = list(vec![int(1), list(vec![int(2)]), int(3)]);
        let flat = flatten_init(Some(&init), &[2, 2, 2]);
        assert_eq!(values(&flat), vec![1, 0, 0, 0, 2, 3, 0, 0]);
    }

    #[test]
    fn test_empty_braces() {
        let init = list(vec![]);
        let flat = flatten_init(Some(&init), &[2, 2]);
        assert_eq!(values(&flat), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_excess_elements_dropped() {
        let init = list(vec![int(1), int(2), int(3), int(4)]);
        let flat = flatten_init(Some(&init), &[3]);
        assert_eq!(values(&flat), vec![1, 2, 3]);
    }

    #[test]
    fn test_length_matches_product() {
        for dims in [vec![4usize], vec![2, 3], vec![2, 2, 2]] {
            let init = list(vec![int(1)]);
            assert_eq!(flatten_init(Some(&init), &dims).len(), product(&dims));
        }
    }

    #[test]
    fn test_linear_to_indices() {
        assert_eq!(linear_to_indices(0, &[2, 3]), vec![0, 0]);
        assert_eq!(linear_to_indices(4, &[2, 3]), vec![1, 1]);
        assert_eq!(linear_to_indices(5, &[2, 3]), vec![1, 2]);
        assert_eq!(linear_to_indices(6, &[2, 2, 2]), vec![1, 1, 0]);
    }
}
