//! rv32i_sim: 单线程 RV32I 仿真库
//!
//! 逐条执行裸机 RV32I 程序：取指、解码、执行、更新 PC。
//! 程序跳转到地址 0 即视为结束。
//!
//! # 模块结构
//!
//! - `isa`: RISC-V 指令字段、解码与反汇编
//! - `cpu`: 寄存器堆、CPU 核心与单步执行引擎
//! - `memory`: 内存抽象层
//! - `machine`: 机器状态与内存布局
//! - `loader`: 原始二进制与 ELF32 镜像加载
//! - `mainargs`: main 参数编组
//! - `report`: 机器状态转储
//! - `sim_env`: 仿真环境（配置、初始化、运行循环）

pub mod cpu;
pub mod isa;
pub mod loader;
pub mod machine;
pub mod mainargs;
pub mod memory;
pub mod report;
pub mod sim_env;
