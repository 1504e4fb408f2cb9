use sea_orm_migration::prelude::*;

/// 打包订单
#[derive(DeriveIden)]
enum PkgOrders {
    Table,
    Id,
    OrderNo,
    OtaOrderNo,
    Platform,
    ProductId,
    HotelId,
    RoomTypeId,
    CheckInDate,
    CheckOutDate,
    Quantity,
    UnitPrice,
    TotalAmount,
    SettlementAmount,
    Status,
    ContactName,
    ContactPhone,
    Remark,
    PaidAt,
    ConfirmedAt,
    CancelledAt,
    CreatedAt,
    UpdatedAt,
}

/// 订单资源子单
#[derive(DeriveIden)]
enum PkgOrderItems {
    Table,
    Id,
    OrderId,
    ItemType,
    ResourceId,
    ResourceName,
    Quantity,
    UnitPrice,
    TotalPrice,
    Status,
    ResourceOrderNo,
    ErrorMessage,
    RetryCount,
    MaxRetries,
    ProcessedAt,
    CreatedAt,
    UpdatedAt,
}

/// 异常订单
#[derive(DeriveIden)]
enum ExceptionOrders {
    Table,
    Id,
    OrderId,
    ExceptionType,
    Status,
    ExceptionData,
    Handler,
    ResolvedAt,
    ResolveRemark,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PkgOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PkgOrders::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PkgOrders::OrderNo)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PkgOrders::OtaOrderNo).string_len(64).not_null())
                    .col(ColumnDef::new(PkgOrders::Platform).string_len(16).not_null())
                    .col(ColumnDef::new(PkgOrders::ProductId).big_integer().not_null())
                    .col(ColumnDef::new(PkgOrders::HotelId).big_integer().not_null())
                    .col(ColumnDef::new(PkgOrders::RoomTypeId).big_integer().not_null())
                    .col(ColumnDef::new(PkgOrders::CheckInDate).date().not_null())
                    .col(ColumnDef::new(PkgOrders::CheckOutDate).date().not_null())
                    .col(
                        ColumnDef::new(PkgOrders::Quantity)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(PkgOrders::UnitPrice)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PkgOrders::TotalAmount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PkgOrders::SettlementAmount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PkgOrders::Status)
                            .string_len(16)
                            .not_null()
                            .default("paid"),
                    )
                    .col(ColumnDef::new(PkgOrders::ContactName).string().not_null())
                    .col(ColumnDef::new(PkgOrders::ContactPhone).string_len(32).not_null())
                    .col(ColumnDef::new(PkgOrders::Remark).text().null())
                    .col(ColumnDef::new(PkgOrders::PaidAt).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(PkgOrders::ConfirmedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PkgOrders::CancelledAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PkgOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(PkgOrders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一平台订单号只落一单
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pkg_orders_platform_ota_no")
                    .table(PkgOrders::Table)
                    .col(PkgOrders::Platform)
                    .col(PkgOrders::OtaOrderNo)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PkgOrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PkgOrderItems::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PkgOrderItems::OrderId).big_integer().not_null())
                    .col(ColumnDef::new(PkgOrderItems::ItemType).string_len(16).not_null())
                    .col(
                        ColumnDef::new(PkgOrderItems::ResourceId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PkgOrderItems::ResourceName).string().not_null())
                    .col(ColumnDef::new(PkgOrderItems::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(PkgOrderItems::UnitPrice)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PkgOrderItems::TotalPrice)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PkgOrderItems::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(PkgOrderItems::ResourceOrderNo)
                            .string_len(128)
                            .null(),
                    )
                    .col(ColumnDef::new(PkgOrderItems::ErrorMessage).text().null())
                    .col(
                        ColumnDef::new(PkgOrderItems::RetryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PkgOrderItems::MaxRetries)
                            .integer()
                            .not_null()
                            .default(3),
                    )
                    .col(
                        ColumnDef::new(PkgOrderItems::ProcessedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PkgOrderItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(PkgOrderItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pkg_order_items_order")
                            .from(PkgOrderItems::Table, PkgOrderItems::OrderId)
                            .to(PkgOrders::Table, PkgOrders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pkg_order_items_order")
                    .table(PkgOrderItems::Table)
                    .col(PkgOrderItems::OrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExceptionOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExceptionOrders::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ExceptionOrders::OrderId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExceptionOrders::ExceptionType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExceptionOrders::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(ExceptionOrders::ExceptionData)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ExceptionOrders::Handler).string_len(64).null())
                    .col(
                        ColumnDef::new(ExceptionOrders::ResolvedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(ExceptionOrders::ResolveRemark).text().null())
                    .col(
                        ColumnDef::new(ExceptionOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(ExceptionOrders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_exception_orders_order")
                            .from(ExceptionOrders::Table, ExceptionOrders::OrderId)
                            .to(PkgOrders::Table, PkgOrders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_exception_orders_status")
                    .table(ExceptionOrders::Table)
                    .col(ExceptionOrders::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ExceptionOrders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PkgOrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PkgOrders::Table).to_owned())
            .await?;
        Ok(())
    }
}
